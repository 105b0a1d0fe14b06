//! Tick data representation.

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Side of a tick.
///
/// `Ask` is the zero value: live ticks with no price-movement signal
/// decode as `Ask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Trade at the ask.
    #[default]
    Ask,
    /// Trade at the bid.
    Bid,
}

impl Direction {
    /// Decodes the archive direction flag byte.
    ///
    /// `0` and `128..=255` are `Bid`, `1..=127` are `Ask`.
    #[must_use]
    pub fn from_flag(flag: u8) -> Option<Self> {
        if flag == 0 || flag >= 128 {
            Some(Self::Bid)
        } else if (1..128).contains(&flag) {
            Some(Self::Ask)
        } else {
            None
        }
    }

    /// Returns the direction as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Bid => "bid",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single decoded market event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    /// Event time in the feed's timezone.
    pub time: DateTime<Tz>,
    /// Decimal price.
    pub cost: f64,
    /// Traded quantity.
    pub volume: u32,
    /// Sequence number within the (pair, contract) stream.
    pub number: u64,
    /// Side of the tick.
    pub direction: Direction,
    /// Instrument name.
    pub pair: String,
    /// Contract textual id (`MM-YY`).
    pub contract: String,
}

/// Raw tick as stored in an archive file (before price normalization).
///
/// Archive records are 26 bytes, little-endian:
/// - `u32`: seconds since midnight (bytes 0-3)
/// - 4 reserved bytes (4-7)
/// - `u32`: raw price (bytes 8-11)
/// - `u32`: volume (bytes 12-15)
/// - `u8`: direction flag (byte 16)
/// - 9 reserved bytes (17-25)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// Seconds offset from the trading day's midnight.
    pub seconds: u32,
    /// Raw price (needs division by the symbol's tick cost).
    pub price_raw: u32,
    /// Volume.
    pub volume: u32,
    /// Direction flag byte.
    pub flag: u8,
}

impl ArchiveRecord {
    /// Size in bytes of an archive record.
    pub const SIZE: usize = 26;

    /// Creates a new archive record.
    #[must_use]
    pub const fn new(seconds: u32, price_raw: u32, volume: u32, flag: u8) -> Self {
        Self {
            seconds,
            price_raw,
            volume,
            flag,
        }
    }

    /// Returns the record time given the trading day's midnight.
    #[must_use]
    pub fn time_from(&self, midnight: DateTime<Tz>) -> DateTime<Tz> {
        midnight + TimeDelta::seconds(i64::from(self.seconds))
    }

    /// Returns the decimal price for the given divisor.
    #[must_use]
    pub fn cost(&self, divisor: f64) -> f64 {
        f64::from(self.price_raw) / divisor
    }
}
