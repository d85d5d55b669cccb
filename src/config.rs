use crate::data::{Interval, KlineQuery, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MAX_LIMIT: u32 = 1000;
pub const MIN_REFRESH_MS: u64 = 100;

/// Hyperparameters of one smoothed curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmootherConfig {
    pub spline_order: usize,
    pub n_splines: usize,
}

impl SmootherConfig {
    pub const fn new(spline_order: usize, n_splines: usize) -> Self {
        Self {
            spline_order,
            n_splines,
        }
    }

    fn is_valid(&self) -> bool {
        self.n_splines > self.spline_order && self.n_splines <= MAX_LIMIT as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub volume: SmootherConfig,
    pub close_tight: SmootherConfig,
    pub close_loose: SmootherConfig,
}

impl SmoothingConfig {
    /// Fewest rows that every smoother can fit.
    pub fn min_rows(&self) -> usize {
        [self.volume, self.close_tight, self.close_loose]
            .iter()
            .map(|s| s.n_splines)
            .max()
            .unwrap_or(1)
            .max(1)
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            volume: SmootherConfig::new(5, 20),
            close_tight: SmootherConfig::new(5, 20),
            close_loose: SmootherConfig::new(5, 50),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub symbol: String,
    pub interval: Interval,
    pub limit: u32,
    pub refresh_ms: u64,
    pub request_timeout_ms: u64,
    pub base_url: String,
    pub smoothing: SmoothingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: "SOLUSDT".to_string(),
            interval: Interval::FiveMinutes,
            limit: 100,
            refresh_ms: 1000,
            request_timeout_ms: 10_000,
            base_url: DEFAULT_BASE_URL.to_string(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl AppConfig {
    pub fn sanitized(mut self) -> Self {
        self.symbol = self.symbol.trim().to_uppercase();
        if self.symbol.is_empty() {
            self.symbol = AppConfig::default().symbol;
        }

        self.refresh_ms = self.refresh_ms.max(MIN_REFRESH_MS);
        self.request_timeout_ms = self.request_timeout_ms.max(MIN_REFRESH_MS);

        if self.base_url.trim().is_empty() {
            self.base_url = DEFAULT_BASE_URL.to_string();
        }

        let defaults = SmoothingConfig::default();
        if !self.smoothing.volume.is_valid() {
            self.smoothing.volume = defaults.volume;
        }
        if !self.smoothing.close_tight.is_valid() {
            self.smoothing.close_tight = defaults.close_tight;
        }
        if !self.smoothing.close_loose.is_valid() {
            self.smoothing.close_loose = defaults.close_loose;
        }

        // Every smoother needs at least one row per basis function.
        let min_rows = self.smoothing.min_rows() as u32;
        let limit = self.limit.clamp(min_rows, MAX_LIMIT);
        if limit > self.limit {
            tracing::warn!(
                requested = self.limit,
                limit,
                "limit too small for the smoothers, raised"
            );
        }
        self.limit = limit;
        self
    }

    /// Applies `GAMCHART_*` overrides. Unparsable values are ignored.
    pub fn with_env_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(symbol) = var("GAMCHART_SYMBOL") {
            self.symbol = symbol;
        }
        if let Some(interval) = var("GAMCHART_INTERVAL") {
            match interval.parse() {
                Ok(parsed) => self.interval = parsed,
                Err(e) => tracing::warn!(error = %e, "ignoring GAMCHART_INTERVAL"),
            }
        }
        if let Some(limit) = var("GAMCHART_LIMIT").and_then(|v| v.trim().parse().ok()) {
            self.limit = limit;
        }
        if let Some(ms) = var("GAMCHART_REFRESH_MS").and_then(|v| v.trim().parse().ok()) {
            self.refresh_ms = ms;
        }
        self
    }

    pub fn query(&self) -> KlineQuery {
        KlineQuery {
            symbol: self.symbol.clone(),
            interval: self.interval,
            limit: self.limit,
        }
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

pub fn config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".gamchart.json")
}

/// Reads the config file if there is one. A missing file is not an error.
pub fn read_config(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str::<AppConfig>(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_config(path: &Path) -> AppConfig {
    let config = match read_config(path) {
        Ok(Some(config)) => {
            tracing::info!(path = %path.display(), "loaded config");
            config
        }
        Ok(None) => AppConfig::default(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            AppConfig::default()
        }
    };

    config
        .with_env_overrides(|key| std::env::var(key).ok())
        .sanitized()
}
