use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kline bar width as accepted by the exchange's `interval` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    OneSecond,
    OneMinute,
    ThreeMinutes,
    #[default]
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    TwoHours,
    FourHours,
    SixHours,
    EightHours,
    TwelveHours,
    OneDay,
    ThreeDays,
    OneWeek,
    OneMonth,
}

impl Interval {
    pub fn all() -> Vec<Interval> {
        vec![
            Interval::OneSecond,
            Interval::OneMinute,
            Interval::ThreeMinutes,
            Interval::FiveMinutes,
            Interval::FifteenMinutes,
            Interval::ThirtyMinutes,
            Interval::OneHour,
            Interval::TwoHours,
            Interval::FourHours,
            Interval::SixHours,
            Interval::EightHours,
            Interval::TwelveHours,
            Interval::OneDay,
            Interval::ThreeDays,
            Interval::OneWeek,
            Interval::OneMonth,
        ]
    }

    pub fn as_binance(&self) -> &'static str {
        match self {
            Interval::OneSecond => "1s",
            Interval::OneMinute => "1m",
            Interval::ThreeMinutes => "3m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::TwoHours => "2h",
            Interval::FourHours => "4h",
            Interval::SixHours => "6h",
            Interval::EightHours => "8h",
            Interval::TwelveHours => "12h",
            Interval::OneDay => "1d",
            Interval::ThreeDays => "3d",
            Interval::OneWeek => "1w",
            Interval::OneMonth => "1M",
        }
    }

    /// Nominal width of one bar. A month counts as 30 days.
    pub fn bar_duration(&self) -> TimeDelta {
        match self {
            Interval::OneSecond => TimeDelta::seconds(1),
            Interval::OneMinute => TimeDelta::minutes(1),
            Interval::ThreeMinutes => TimeDelta::minutes(3),
            Interval::FiveMinutes => TimeDelta::minutes(5),
            Interval::FifteenMinutes => TimeDelta::minutes(15),
            Interval::ThirtyMinutes => TimeDelta::minutes(30),
            Interval::OneHour => TimeDelta::hours(1),
            Interval::TwoHours => TimeDelta::hours(2),
            Interval::FourHours => TimeDelta::hours(4),
            Interval::SixHours => TimeDelta::hours(6),
            Interval::EightHours => TimeDelta::hours(8),
            Interval::TwelveHours => TimeDelta::hours(12),
            Interval::OneDay => TimeDelta::days(1),
            Interval::ThreeDays => TimeDelta::days(3),
            Interval::OneWeek => TimeDelta::weeks(1),
            Interval::OneMonth => TimeDelta::days(30),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_binance())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kline interval `{0}`")]
pub struct UnknownInterval(pub String);

impl FromStr for Interval {
    type Err = UnknownInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) and "1m" (minute) differ only by case, so no lowercasing.
        let trimmed = s.trim();
        Interval::all()
            .into_iter()
            .find(|i| i.as_binance() == trimmed)
            .ok_or_else(|| UnknownInterval(trimmed.to_string()))
    }
}

impl TryFrom<String> for Interval {
    type Error = UnknownInterval;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_binance().to_string()
    }
}
