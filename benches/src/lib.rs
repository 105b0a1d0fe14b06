//! Fixture generators for the sbpro decode benchmarks.

use std::io::{self, Write};

use byteorder::{ByteOrder, LittleEndian};
use flate2::Compression;
use flate2::write::GzEncoder;
use sbpro_types::ArchiveRecord;

/// Builds a live poll response carrying `count` ticks plus the trailing placeholder.
pub fn live_response(pair: &str, contract: &str, count: u64) -> String {
    let mut response = format!("{pair} {contract};{pair} {contract}:");
    for number in 1..=count {
        let price = 111_380 + (number % 7) as i32 - 3;
        response.push_str(&format!(
            "20200117 074545.991;{price};{};111380;111385;{number};11;66;0;0|",
            number % 5 + 1
        ));
    }
    response.push('*');
    response
}

/// Builds `count` raw archive records, one second apart from 09:30.
pub fn archive_records(count: u32) -> Vec<u8> {
    let mut raw = vec![0u8; count as usize * ArchiveRecord::SIZE];
    for (i, record) in raw.chunks_exact_mut(ArchiveRecord::SIZE).enumerate() {
        let i = i as u32;
        LittleEndian::write_u32(&mut record[0..4], 34_200 + i);
        LittleEndian::write_u32(&mut record[8..12], 15_230 + i % 11);
        LittleEndian::write_u32(&mut record[12..16], i % 9 + 1);
        record[16] = if i % 2 == 0 { 0 } else { 1 };
    }
    raw
}

/// Gzip-compresses `data` the way the archive server ships it.
pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Builds a byte stream of `count` live frames back to back.
pub fn framed_stream(payload: &str, count: usize) -> Vec<u8> {
    let frame = sbpro_wire::encode_frame(payload);
    frame.repeat(count)
}
