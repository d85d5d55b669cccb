use crate::data::Interval;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const KLINES_PATH: &str = "/api/v3/klines";
const KLINE_COLUMNS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleColor {
    Up,
    Down,
}

impl CandleColor {
    pub fn from_prices(open: f64, close: f64) -> Self {
        if close > open {
            CandleColor::Up
        } else {
            CandleColor::Down
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: DateTime<Utc>,
    pub quote_volume: f64,
    pub number_of_trades: u64,
    pub taker_buy_base: f64,
    pub taker_buy_quote: f64,
    pub color: CandleColor,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("kline request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("kline endpoint answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed kline row {row}: {reason}")]
    Malformed { row: usize, reason: String },
    #[error("expected at most {limit} klines, got {got}")]
    TooManyRows { limit: u32, got: usize },
    #[error("kline row {row} opens before the previous row")]
    OutOfOrder { row: usize },
}

/// Kline query parameters for a single refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlineQuery {
    pub symbol: String,
    pub interval: Interval,
    pub limit: u32,
}

impl Default for KlineQuery {
    fn default() -> Self {
        Self {
            symbol: "SOLUSDT".to_string(),
            interval: Interval::FiveMinutes,
            limit: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KlineClient {
    client: Client,
    base_url: String,
}

impl KlineClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, KLINES_PATH)
    }

    pub async fn fetch_klines(&self, query: &KlineQuery) -> Result<Vec<Kline>, FetchError> {
        let limit_str = query.limit.to_string();
        let res = self
            .client
            .get(self.endpoint())
            .query(&[
                ("symbol", query.symbol.as_str()),
                ("interval", query.interval.as_binance()),
                ("limit", &limit_str),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let rows = res.json::<Vec<Value>>().await?;
        tracing::debug!(symbol = %query.symbol, rows = rows.len(), "klines received");
        parse_klines(&rows, query.limit)
    }
}

/// Converts the exchange's 12-column kline arrays into typed rows. Any
/// malformed row rejects the whole response.
pub fn parse_klines(rows: &[Value], limit: u32) -> Result<Vec<Kline>, FetchError> {
    if rows.len() > limit as usize {
        return Err(FetchError::TooManyRows {
            limit,
            got: rows.len(),
        });
    }

    let mut klines: Vec<Kline> = Vec::with_capacity(rows.len());
    for (row, value) in rows.iter().enumerate() {
        let kline = parse_row(row, value)?;
        if let Some(prev) = klines.last() {
            if kline.open_time < prev.open_time {
                return Err(FetchError::OutOfOrder { row });
            }
        }
        klines.push(kline);
    }
    Ok(klines)
}

fn parse_row(row: usize, value: &Value) -> Result<Kline, FetchError> {
    let malformed = |reason: String| FetchError::Malformed { row, reason };

    let arr = value
        .as_array()
        .ok_or_else(|| malformed("not an array".to_string()))?;
    if arr.len() != KLINE_COLUMNS {
        return Err(malformed(format!(
            "expected {} columns, found {}",
            KLINE_COLUMNS,
            arr.len()
        )));
    }

    let open_time = timestamp(&arr[0]).ok_or_else(|| malformed("bad open time".into()))?;
    let close_time = timestamp(&arr[6]).ok_or_else(|| malformed("bad close time".into()))?;
    let decimal = |idx: usize, name: &str| {
        number(&arr[idx]).ok_or_else(|| malformed(format!("bad {name}")))
    };

    let open = decimal(1, "open")?;
    let high = decimal(2, "high")?;
    let low = decimal(3, "low")?;
    let close = decimal(4, "close")?;
    let volume = decimal(5, "volume")?;
    let quote_volume = decimal(7, "quote asset volume")?;
    let number_of_trades = arr[8]
        .as_u64()
        .ok_or_else(|| malformed("bad number of trades".into()))?;
    let taker_buy_base = decimal(9, "taker buy base volume")?;
    let taker_buy_quote = decimal(10, "taker buy quote volume")?;

    Ok(Kline {
        open_time,
        open,
        high,
        low,
        close,
        volume,
        close_time,
        quote_volume,
        number_of_trades,
        taker_buy_base,
        taker_buy_quote,
        color: CandleColor::from_prices(open, close),
    })
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let millis = value.as_i64()?;
    Utc.timestamp_millis_opt(millis).single()
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}
