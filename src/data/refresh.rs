use crate::config::{SmootherConfig, SmoothingConfig};
use crate::data::{Kline, KlineClient, KlineQuery, PlotData, PlotSource, SmoothedColumns};
use crate::indicators::{calculate_gam, SmoothError};
use chrono::Utc;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Fetching,
    Smoothing,
    Publishing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Smooth,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => f.write_str("fetch"),
            Stage::Smooth => f.write_str("smooth"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshEvent {
    Published { generation: u64, rows: usize },
    Failed { stage: Stage, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{column}: {source}")]
    Smooth {
        column: &'static str,
        source: SmoothError,
    },
    #[error(transparent)]
    Store(#[from] crate::data::StoreError),
}

fn smooth(
    column: &'static str,
    values: &[f64],
    cfg: SmootherConfig,
) -> Result<Vec<f64>, BuildError> {
    calculate_gam(values, cfg.spline_order, cfg.n_splines)
        .map_err(|source| BuildError::Smooth { column, source })
}

/// Fits the three smoothed curves and shapes one cycle's klines into the
/// columnar table the views draw from.
pub fn build_plot_data(klines: &[Kline], cfg: &SmoothingConfig) -> Result<PlotData, BuildError> {
    let close: Vec<f64> = klines.iter().map(|k| k.close).collect();
    let volume: Vec<f64> = klines.iter().map(|k| k.volume).collect();

    let smoothed = SmoothedColumns {
        volume_gam: smooth("volume", &volume, cfg.volume)?,
        close_gam_tight: smooth("close", &close, cfg.close_tight)?,
        close_gam_loose: smooth("close", &close, cfg.close_loose)?,
    };
    Ok(PlotData::new(klines, smoothed)?)
}

pub struct RefreshLoop {
    client: KlineClient,
    query: KlineQuery,
    smoothing: SmoothingConfig,
    period: Duration,
    state: RefreshState,
}

impl RefreshLoop {
    pub fn new(
        client: KlineClient,
        query: KlineQuery,
        smoothing: SmoothingConfig,
        period: Duration,
    ) -> Self {
        Self {
            client,
            query,
            smoothing,
            period,
            state: RefreshState::Idle,
        }
    }

    fn transition(&mut self, next: RefreshState) {
        tracing::debug!(from = ?self.state, to = ?next, "refresh state");
        self.state = next;
    }

    /// Starts the loop on the runtime. The store receiver is the only way to
    /// read published data; the loop exits once every receiver is dropped.
    pub fn spawn(
        self,
    ) -> (
        watch::Receiver<PlotSource>,
        mpsc::Receiver<RefreshEvent>,
        JoinHandle<()>,
    ) {
        let (store_tx, store_rx) = watch::channel(PlotSource::new());
        let (event_tx, event_rx) = mpsc::channel(32);
        let handle = tokio::spawn(self.run(store_tx, event_tx));
        (store_rx, event_rx, handle)
    }

    async fn run(mut self, store: watch::Sender<PlotSource>, events: mpsc::Sender<RefreshEvent>) {
        let mut ticker = tokio::time::interval(self.period);
        // A slow cycle delays the next one; missed ticks are dropped, never queued.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            symbol = %self.query.symbol,
            interval = %self.query.interval,
            limit = self.query.limit,
            period_ms = self.period.as_millis() as u64,
            "refresh loop started"
        );

        loop {
            ticker.tick().await;
            if store.is_closed() {
                break;
            }

            let event = self.cycle(&store).await;
            if let RefreshEvent::Failed { stage, message } = &event {
                tracing::warn!(%stage, error = %message, "refresh cycle skipped");
            }
            // The status bar is best effort; a full channel only drops a status line.
            let _ = events.try_send(event);
        }

        tracing::info!("refresh loop stopped");
    }

    async fn cycle(&mut self, store: &watch::Sender<PlotSource>) -> RefreshEvent {
        self.transition(RefreshState::Fetching);
        let klines = match self.client.fetch_klines(&self.query).await {
            Ok(klines) => klines,
            Err(e) => {
                self.transition(RefreshState::Idle);
                return RefreshEvent::Failed {
                    stage: Stage::Fetch,
                    message: e.to_string(),
                };
            }
        };

        self.transition(RefreshState::Smoothing);
        let data = match build_plot_data(&klines, &self.smoothing) {
            Ok(data) => data,
            Err(e) => {
                self.transition(RefreshState::Idle);
                return RefreshEvent::Failed {
                    stage: Stage::Smooth,
                    message: e.to_string(),
                };
            }
        };

        self.transition(RefreshState::Publishing);
        let rows = data.len();
        let mut generation = 0;
        store.send_modify(|source| {
            source.replace(data, Utc::now());
            generation = source.generation();
        });
        self.transition(RefreshState::Idle);

        tracing::debug!(generation, rows, "store published");
        RefreshEvent::Published { generation, rows }
    }
}
