//! Binary archive record decoding.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use sbpro_types::{ArchiveRecord, Direction, Symbol, Tick};

use crate::DecodeError;

/// Parses one 26-byte little-endian archive record.
///
/// # Errors
///
/// Returns an error if `data` is not exactly [`ArchiveRecord::SIZE`] bytes.
pub fn parse_archive_record(data: &[u8]) -> Result<ArchiveRecord, DecodeError> {
    if data.len() != ArchiveRecord::SIZE {
        return Err(DecodeError::RecordLength {
            expected: ArchiveRecord::SIZE,
            actual: data.len(),
        });
    }

    Ok(ArchiveRecord::new(
        LittleEndian::read_u32(&data[0..4]),
        LittleEndian::read_u32(&data[8..12]),
        LittleEndian::read_u32(&data[12..16]),
        data[16],
    ))
}

/// Returns midnight of `date` in the feed timezone.
///
/// # Errors
///
/// Returns an error if midnight does not exist on that date in `tz`.
pub fn trading_midnight(date: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, DecodeError> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| DecodeError::NonexistentLocalTime(naive.to_string()))
}

/// Decodes one archive record into a [`Tick`].
///
/// `number` is the record's 1-based position in the archive file and
/// becomes the tick's sequence number.
///
/// # Errors
///
/// Returns an error if the record has the wrong length or an unknown
/// direction flag.
pub fn decode_archive_tick(
    data: &[u8],
    midnight: DateTime<Tz>,
    symbol: &Symbol,
    contract: &str,
    number: u64,
) -> Result<Tick, DecodeError> {
    let record = parse_archive_record(data)?;
    let direction =
        Direction::from_flag(record.flag).ok_or(DecodeError::InvalidDirection(record.flag))?;

    Ok(Tick {
        time: record.time_from(midnight),
        cost: record.cost(symbol.divisor_f64()),
        volume: record.volume,
        number,
        direction,
        pair: symbol.name().to_string(),
        contract: contract.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono_tz::America::Chicago;

    fn record_bytes(seconds: u32, price: u32, volume: u32, flag: u8) -> Vec<u8> {
        let mut bytes = vec![0xAAu8; ArchiveRecord::SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], seconds);
        LittleEndian::write_u32(&mut bytes[8..12], price);
        LittleEndian::write_u32(&mut bytes[12..16], volume);
        bytes[16] = flag;
        bytes
    }

    fn symbol() -> Symbol {
        Symbol::new("GC", 10, vec!["04-20".parse().unwrap()])
    }

    #[test]
    fn test_parse_archive_record() {
        let record = parse_archive_record(&record_bytes(1000, 15_234, 3, 7)).unwrap();
        assert_eq!(record, ArchiveRecord::new(1000, 15_234, 3, 7));
    }

    #[test]
    fn test_decode_archive_tick() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let midnight = trading_midnight(date, Chicago).unwrap();
        let record = record_bytes(34_200, 15_234, 3, 0);
        let tick = decode_archive_tick(&record, midnight, &symbol(), "04-20", 1).unwrap();

        assert_eq!(tick.time, Chicago.with_ymd_and_hms(2020, 1, 1, 9, 30, 0).unwrap());
        assert_relative_eq!(tick.cost, 1523.4);
        assert_eq!(tick.volume, 3);
        assert_eq!(tick.number, 1);
        assert_eq!(tick.direction, Direction::Bid);
        assert_eq!(tick.pair, "GC");
        assert_eq!(tick.contract, "04-20");
    }

    #[test]
    fn test_direction_flag() {
        let midnight = trading_midnight(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), Chicago)
            .unwrap();
        for (flag, expected) in [
            (0, Direction::Bid),
            (1, Direction::Ask),
            (127, Direction::Ask),
            (128, Direction::Bid),
            (255, Direction::Bid),
        ] {
            let tick =
                decode_archive_tick(&record_bytes(0, 1, 1, flag), midnight, &symbol(), "04-20", 1)
                    .unwrap();
            assert_eq!(tick.direction, expected, "flag {flag}");
        }
    }

    #[test]
    fn test_wrong_length() {
        let result = parse_archive_record(&[0u8; 20]);
        assert_eq!(
            result,
            Err(DecodeError::RecordLength {
                expected: 26,
                actual: 20
            })
        );
    }

    #[test]
    fn test_trading_midnight() {
        let midnight =
            trading_midnight(NaiveDate::from_ymd_opt(2020, 7, 4).unwrap(), Chicago).unwrap();
        assert_eq!(midnight, Chicago.with_ymd_and_hms(2020, 7, 4, 0, 0, 0).unwrap());
    }
}
