use crate::data::{CandleColor, Kline};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("column `{column}` has {found} rows, expected {expected}")]
    ColumnLength {
        column: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Smoothed curves computed for one cycle, one value per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothedColumns {
    pub volume_gam: Vec<f64>,
    pub close_gam_tight: Vec<f64>,
    pub close_gam_loose: Vec<f64>,
}

/// Columnar table the chart views draw from. Every column has the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotData {
    time: Vec<DateTime<Utc>>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    candle_color: Vec<CandleColor>,
    volume_gam: Vec<f64>,
    close_gam_tight: Vec<f64>,
    close_gam_loose: Vec<f64>,
}

/// One row of [`PlotData`], used for hover inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotRow {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PlotData {
    pub fn new(klines: &[Kline], smoothed: SmoothedColumns) -> Result<Self, StoreError> {
        let expected = klines.len();
        for (column, found) in [
            ("volume_gam", smoothed.volume_gam.len()),
            ("close_gam_tight", smoothed.close_gam_tight.len()),
            ("close_gam_loose", smoothed.close_gam_loose.len()),
        ] {
            if found != expected {
                return Err(StoreError::ColumnLength {
                    column,
                    expected,
                    found,
                });
            }
        }

        Ok(Self {
            time: klines.iter().map(|k| k.open_time).collect(),
            open: klines.iter().map(|k| k.open).collect(),
            high: klines.iter().map(|k| k.high).collect(),
            low: klines.iter().map(|k| k.low).collect(),
            close: klines.iter().map(|k| k.close).collect(),
            volume: klines.iter().map(|k| k.volume).collect(),
            candle_color: klines.iter().map(|k| k.color).collect(),
            volume_gam: smoothed.volume_gam,
            close_gam_tight: smoothed.close_gam_tight,
            close_gam_loose: smoothed.close_gam_loose,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    pub fn candle_color(&self) -> &[CandleColor] {
        &self.candle_color
    }

    pub fn volume_gam(&self) -> &[f64] {
        &self.volume_gam
    }

    pub fn close_gam_tight(&self) -> &[f64] {
        &self.close_gam_tight
    }

    pub fn close_gam_loose(&self) -> &[f64] {
        &self.close_gam_loose
    }

    pub fn row(&self, idx: usize) -> Option<PlotRow> {
        if idx >= self.len() {
            return None;
        }
        Some(PlotRow {
            time: self.time[idx],
            open: self.open[idx],
            high: self.high[idx],
            low: self.low[idx],
            close: self.close[idx],
            volume: self.volume[idx],
        })
    }
}

/// The published store value. Starts empty and is overwritten whole on
/// every refresh.
#[derive(Debug, Clone, Default)]
pub struct PlotSource {
    data: PlotData,
    generation: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl PlotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, data: PlotData, at: DateTime<Utc>) {
        self.data = data;
        self.generation += 1;
        self.updated_at = Some(at);
    }

    pub fn data(&self) -> &PlotData {
        &self.data
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::fetch::tests::kline_row;
    use crate::data::parse_klines;

    pub(crate) fn sample_klines(rows: usize, base: f64) -> Vec<Kline> {
        let raw: Vec<_> = (0..rows)
            .map(|i| {
                let open = base + (i % 5) as f64;
                let close = base + ((i + 2) % 5) as f64;
                kline_row(1_700_000_000_000 + i as i64 * 300_000, open, close, 10.0 + i as f64)
            })
            .collect();
        parse_klines(&raw, rows as u32).unwrap()
    }

    pub(crate) fn sample_data(rows: usize) -> PlotData {
        let klines = sample_klines(rows, 100.0);
        let smoothed = SmoothedColumns {
            volume_gam: klines.iter().map(|k| k.volume).collect(),
            close_gam_tight: klines.iter().map(|k| k.close).collect(),
            close_gam_loose: klines.iter().map(|k| k.close + 0.5).collect(),
        };
        PlotData::new(&klines, smoothed).unwrap()
    }

    #[test]
    fn columns_share_length() {
        let data = sample_data(12);
        assert_eq!(data.len(), 12);
        assert_eq!(data.time().len(), 12);
        assert_eq!(data.candle_color().len(), 12);
        assert_eq!(data.volume_gam().len(), 12);
        assert_eq!(data.close_gam_loose().len(), 12);
    }

    #[test]
    fn rejects_misaligned_smoothed_column() {
        let klines = sample_klines(5, 1.0);
        let smoothed = SmoothedColumns {
            volume_gam: vec![0.0; 5],
            close_gam_tight: vec![0.0; 4],
            close_gam_loose: vec![0.0; 5],
        };
        assert_eq!(
            PlotData::new(&klines, smoothed),
            Err(StoreError::ColumnLength {
                column: "close_gam_tight",
                expected: 5,
                found: 4
            })
        );
    }

    #[test]
    fn row_lookup_is_bounded() {
        let data = sample_data(3);
        let row = data.row(2).unwrap();
        assert_eq!(row.time, data.time()[2]);
        assert_eq!(row.close, data.close()[2]);
        assert!(data.row(3).is_none());
    }

    #[test]
    fn store_starts_empty() {
        let source = PlotSource::new();
        assert!(source.data().is_empty());
        assert_eq!(source.generation(), 0);
        assert!(source.updated_at().is_none());
    }

    #[test]
    fn consecutive_replaces_do_not_append() {
        let mut source = PlotSource::new();
        source.replace(sample_data(100), Utc::now());
        source.replace(sample_data(100), Utc::now());
        assert_eq!(source.data().len(), 100);
        assert_eq!(source.generation(), 2);

        source.replace(sample_data(40), Utc::now());
        assert_eq!(source.data().len(), 40);
        assert_eq!(source.generation(), 3);
    }
}
