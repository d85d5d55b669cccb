pub mod fetch;
pub mod interval;
pub mod refresh;
pub mod source;

pub use fetch::*;
pub use interval::Interval;
pub use refresh::{RefreshEvent, RefreshLoop, Stage};
pub use source::{PlotData, PlotRow, PlotSource, SmoothedColumns, StoreError};
