//! Live-feed text tick decoding.

use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use sbpro_types::{Direction, Tick};

use crate::DecodeError;

/// Number of `;` separated fields in a live tick.
pub const LIVE_FIELD_COUNT: usize = 10;

/// `chrono` format of the live tick timestamp (`yyyyMMdd HHmmss.fff`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d %H%M%S%.3f";

/// Derives the tick side from price movement.
///
/// `Ask` if the previous reference price is below the tick price, otherwise
/// `Bid` if the next reference price is above it, otherwise the zero value
/// (`Ask`).
#[must_use]
pub fn direction_from_prices(cost: f64, previous: f64, next: f64) -> Direction {
    if previous < cost {
        Direction::Ask
    } else if next > cost {
        Direction::Bid
    } else {
        Direction::default()
    }
}

/// Decodes one live tick.
///
/// Field layout (`;` separated, exactly 10 fields):
/// - 0: timestamp in `tz`, `yyyyMMdd HHmmss.fff`
/// - 1: raw tick price
/// - 2: volume
/// - 3, 4: raw previous/next reference prices (direction only)
/// - 5: sequence number
/// - 6-9: unused
///
/// # Errors
///
/// Returns an error if the field count is wrong or any used field fails to
/// parse.
pub fn decode_live_tick(
    text: &str,
    pair: &str,
    contract: &str,
    divisor: f64,
    tz: Tz,
) -> Result<Tick, DecodeError> {
    let items: Vec<&str> = text.split(';').collect();
    if items.len() != LIVE_FIELD_COUNT {
        return Err(DecodeError::FieldCount(items.len()));
    }

    let time = parse_timestamp(items[0], tz)?;
    let cost = f64::from(parse_price(items[1])?) / divisor;
    let previous = f64::from(parse_price(items[3])?) / divisor;
    let next = f64::from(parse_price(items[4])?) / divisor;

    let volume: u32 = items[2].parse().map_err(|_| DecodeError::InvalidNumber {
        field: "volume",
        value: items[2].to_string(),
    })?;
    let number: u64 = items[5].parse().map_err(|_| DecodeError::InvalidNumber {
        field: "number",
        value: items[5].to_string(),
    })?;

    Ok(Tick {
        time,
        cost,
        volume,
        number,
        direction: direction_from_prices(cost, previous, next),
        pair: pair.to_string(),
        contract: contract.to_string(),
    })
}

fn parse_timestamp(s: &str, tz: Tz) -> Result<chrono::DateTime<Tz>, DecodeError> {
    let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|_| DecodeError::InvalidTimestamp(s.to_string()))?;
    // Ambiguous fall-back hours resolve to the earlier instant.
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| DecodeError::NonexistentLocalTime(s.to_string()))
}

#[inline]
fn parse_price(s: &str) -> Result<i32, DecodeError> {
    s.parse().map_err(|_| DecodeError::InvalidNumber {
        field: "price",
        value: s.to_string(),
    })
}
