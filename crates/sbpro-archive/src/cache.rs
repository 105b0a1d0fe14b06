//! The on-disk archive cache.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::Tz;
use flate2::read::MultiGzDecoder;
use sbpro_types::{ArchiveRecord, Symbol, Tick};
use sbpro_wire::{decode_archive_tick, trading_midnight};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{ArchiveError, ArchiveKey, ArchiveSource, Result};

/// File extension of cached archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Write-once cache of per-day tick archives.
///
/// Entries live at `<root>/<symbol>/<contract>/<YYYYMMDD>.zip` and are never
/// rewritten or invalidated once created.
#[derive(Debug, Clone)]
pub struct TickArchive<S> {
    root: PathBuf,
    timezone: Tz,
    source: S,
}

impl<S: ArchiveSource> TickArchive<S> {
    /// Creates a cache rooted at `root`, dating archives in `timezone`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, timezone: Tz, source: S) -> Self {
        Self {
            root: root.into(),
            timezone,
            source,
        }
    }

    /// Returns the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the feed timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Returns the archive source used on cache misses.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Returns the trading date of `at` in the feed timezone.
    #[must_use]
    pub fn trading_date<T: TimeZone>(&self, at: &DateTime<T>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }

    /// Returns the cache path for one trading day of a contract.
    #[must_use]
    pub fn cache_path(&self, date: NaiveDate, symbol: &str, contract: &str) -> PathBuf {
        self.root.join(symbol).join(contract).join(format!(
            "{}.{ARCHIVE_EXTENSION}",
            date.format("%Y%m%d")
        ))
    }

    /// Returns true if the archive for this day is already cached.
    #[must_use]
    pub fn contains(&self, date: NaiveDate, symbol: &str, contract: &str) -> bool {
        self.cache_path(date, symbol, contract).is_file()
    }

    /// Returns the ticks of one trading day of a contract.
    ///
    /// Reads from the cache when present. Otherwise fetches from the source,
    /// persists the exact received bytes, then decodes them. A day with no
    /// data on the server yields an empty vector and leaves no cache entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails, the cache cannot be written, or
    /// the archive is corrupt.
    pub async fn get_ticks(
        &self,
        date: NaiveDate,
        symbol: &Symbol,
        contract: &str,
    ) -> Result<Vec<Tick>> {
        let path = self.cache_path(date, symbol.name(), contract);

        if path.is_file() {
            debug!(symbol = symbol.name(), contract, path = %path.display(), "archive cached");
        } else {
            info!(
                symbol = symbol.name(),
                contract,
                %date,
                "archive not cached, fetching from server"
            );
            let key = ArchiveKey::new(symbol.name(), contract, date);
            let bytes = match self.source.fetch(&key).await? {
                Some(bytes) if !bytes.is_empty() => bytes,
                _ => {
                    info!(symbol = symbol.name(), contract, %date, "no archive on server");
                    return Ok(Vec::new());
                }
            };

            let target = path.clone();
            let dispatch = tracing::dispatcher::get_default(Clone::clone);
            tokio::task::spawn_blocking(move || {
                tracing::dispatcher::with_default(&dispatch, || persist(&target, &bytes))
            })
            .await
            .map_err(|e| ArchiveError::Task(e.to_string()))??;
        }

        let midnight = trading_midnight(date, self.timezone)?;
        let symbol = symbol.clone();
        let contract = contract.to_string();
        // Decompression is CPU bound, keep it off the async workers.
        let ticks =
            tokio::task::spawn_blocking(move || read_archive(&path, midnight, &symbol, &contract))
                .await
                .map_err(|e| ArchiveError::Task(e.to_string()))??;

        info!(count = ticks.len(), %date, "archive ticks loaded");
        Ok(ticks)
    }
}

/// Writes `bytes` to `path` unless it already exists.
///
/// The data goes to a temporary file in the target directory first and is
/// then linked into place without clobbering, so readers never observe a
/// partial file. When another writer got there first its file is kept.
fn persist(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|source| ArchiveError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let write_err = |source| ArchiveError::WriteFile {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "cache entry created by another writer");
            Ok(())
        }
        Err(e) => Err(write_err(e.error)),
    }
}

/// Decodes every record of a cached archive file.
///
/// Records are numbered from 1 in file order.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not gzip, ends with a
/// partial record, or holds an undecodable record.
pub fn read_archive(
    path: &Path,
    midnight: DateTime<Tz>,
    symbol: &Symbol,
    contract: &str,
) -> Result<Vec<Tick>> {
    let file = File::open(path).map_err(|source| ArchiveError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = MultiGzDecoder::new(BufReader::new(file));

    let mut ticks = Vec::new();
    let mut buf = [0u8; ArchiveRecord::SIZE];
    let mut number = 0u64;

    loop {
        let filled = read_record(&mut reader, &mut buf).map_err(|source| {
            ArchiveError::Decompress {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if filled == 0 {
            return Ok(ticks);
        }
        if filled < ArchiveRecord::SIZE {
            return Err(ArchiveError::TruncatedRecord {
                path: path.to_path_buf(),
                offset: number * ArchiveRecord::SIZE as u64,
                len: filled,
            });
        }

        number += 1;
        ticks.push(decode_archive_tick(&buf, midnight, symbol, contract, number)?);
    }
}

/// Fills `buf` from `reader`, returning fewer bytes only at end of stream.
fn read_record(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use byteorder::{ByteOrder, LittleEndian};
    use chrono::Utc;
    use chrono_tz::America::Chicago;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use sbpro_types::Direction;
    use sbpro_wire::BulkError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn record(seconds: u32, price: u32, volume: u32, flag: u8) -> [u8; ArchiveRecord::SIZE] {
        let mut bytes = [0u8; ArchiveRecord::SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], seconds);
        LittleEndian::write_u32(&mut bytes[8..12], price);
        LittleEndian::write_u32(&mut bytes[12..16], volume);
        bytes[16] = flag;
        bytes
    }

    fn gzip(raw: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw).unwrap();
        encoder.finish().unwrap()
    }

    fn sample_archive() -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&record(34_200, 15_234, 3, 0));
        raw.extend_from_slice(&record(34_201, 15_236, 1, 5));
        raw.extend_from_slice(&record(34_260, 15_230, 7, 200));
        gzip(&raw)
    }

    fn gold() -> Symbol {
        Symbol::new("GC", 10, vec!["04-20".parse().unwrap()])
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()
    }

    /// Serves a fixed response and records every key it was asked for.
    #[derive(Debug, Default)]
    struct MockSource {
        response: Option<Vec<u8>>,
        fetches: AtomicUsize,
        keys: Mutex<Vec<ArchiveKey>>,
    }

    impl MockSource {
        fn serving(response: Option<Vec<u8>>) -> Self {
            Self {
                response,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ArchiveSource for MockSource {
        async fn fetch(&self, key: &ArchiveKey) -> std::result::Result<Option<Vec<u8>>, BulkError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.keys.lock().unwrap().push(key.clone());
            Ok(self.response.clone())
        }
    }

    #[test]
    fn test_cache_path() {
        let archive = TickArchive::new("cache", Chicago, MockSource::default());
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

        for _ in 0..3 {
            assert_eq!(
                archive.cache_path(date, "GC", "04-20"),
                PathBuf::from("cache/GC/04-20/20200101.zip")
            );
        }
        assert_eq!(
            archive.cache_path(NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(), "GC", "06-20"),
            PathBuf::from("cache/GC/06-20/20200201.zip")
        );
    }

    #[test]
    fn test_trading_date_uses_feed_timezone() {
        let archive = TickArchive::new("cache", Chicago, MockSource::default());

        // 03:00 UTC on Jan 2 is still Jan 1 in Chicago.
        let at = Utc.with_ymd_and_hms(2020, 1, 2, 3, 0, 0).unwrap();
        assert_eq!(
            archive.trading_date(&at),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );

        let at = Chicago.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let date = archive.trading_date(&at);
        assert_eq!(
            archive.cache_path(date, "GC", "04-20"),
            PathBuf::from("cache/GC/04-20/20200101.zip")
        );
    }

    #[tokio::test]
    async fn test_fetch_on_miss_then_hit() {
        let tmp = TempDir::new().unwrap();
        let archive = TickArchive::new(
            tmp.path(),
            Chicago,
            MockSource::serving(Some(sample_archive())),
        );

        assert!(!archive.contains(date(), "GC", "04-20"));
        let first = archive.get_ticks(date(), &gold(), "04-20").await.unwrap();
        assert!(archive.contains(date(), "GC", "04-20"));
        let second = archive.get_ticks(date(), &gold(), "04-20").await.unwrap();

        assert_eq!(archive.source().fetches.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(
            archive.source().keys.lock().unwrap()[0],
            ArchiveKey::new("GC", "04-20", date())
        );

        let cached = fs::read(archive.cache_path(date(), "GC", "04-20")).unwrap();
        assert_eq!(cached, sample_archive());
    }

    #[tokio::test]
    async fn test_decoded_records() {
        let tmp = TempDir::new().unwrap();
        let archive = TickArchive::new(
            tmp.path(),
            Chicago,
            MockSource::serving(Some(sample_archive())),
        );

        let ticks = archive.get_ticks(date(), &gold(), "04-20").await.unwrap();
        assert_eq!(ticks.len(), 3);

        let numbers: Vec<u64> = ticks.iter().map(|t| t.number).collect();
        assert_eq!(numbers, [1, 2, 3]);

        let first = &ticks[0];
        assert_eq!(first.time, Chicago.with_ymd_and_hms(2020, 1, 2, 9, 30, 0).unwrap());
        assert_relative_eq!(first.cost, 1523.4);
        assert_eq!(first.volume, 3);
        assert_eq!(first.direction, Direction::Bid);
        assert_eq!(first.pair, "GC");
        assert_eq!(first.contract, "04-20");

        assert_eq!(ticks[1].direction, Direction::Ask);
        assert_eq!(ticks[2].direction, Direction::Bid);
    }

    #[tokio::test]
    async fn test_no_file_is_empty_and_not_cached() {
        let tmp = TempDir::new().unwrap();
        let archive = TickArchive::new(tmp.path(), Chicago, MockSource::serving(None));

        let ticks = archive.get_ticks(date(), &gold(), "04-20").await.unwrap();
        assert!(ticks.is_empty());
        assert!(!archive.contains(date(), "GC", "04-20"));

        // Absence is not cached, so the server is asked again.
        archive.get_ticks(date(), &gold(), "04-20").await.unwrap();
        assert_eq!(archive.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_truncated_record() {
        let tmp = TempDir::new().unwrap();
        let mut raw = record(1, 1, 1, 0).to_vec();
        raw.extend_from_slice(&[0u8; 10]);
        let archive = TickArchive::new(tmp.path(), Chicago, MockSource::serving(Some(gzip(&raw))));

        let result = archive.get_ticks(date(), &gold(), "04-20").await;
        assert!(matches!(
            result,
            Err(ArchiveError::TruncatedRecord {
                offset: 26,
                len: 10,
                ..
            })
        ));
        // The received bytes stay cached even though decoding failed.
        assert!(archive.contains(date(), "GC", "04-20"));
    }

    #[tokio::test]
    async fn test_corrupt_gzip() {
        let tmp = TempDir::new().unwrap();
        let archive = TickArchive::new(
            tmp.path(),
            Chicago,
            MockSource::serving(Some(b"definitely not gzip".to_vec())),
        );

        let result = archive.get_ticks(date(), &gold(), "04-20").await;
        assert!(matches!(result, Err(ArchiveError::Decompress { .. })));
    }

    #[tokio::test]
    async fn test_empty_archive() {
        let tmp = TempDir::new().unwrap();
        let archive = TickArchive::new(tmp.path(), Chicago, MockSource::serving(Some(gzip(&[]))));

        let ticks = archive.get_ticks(date(), &gold(), "04-20").await.unwrap();
        assert!(ticks.is_empty());
        assert!(archive.contains(date(), "GC", "04-20"));
    }

    #[test]
    fn test_persist_first_writer_wins() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("GC").join("04-20").join("20200102.zip");

        persist(&path, b"first").unwrap();
        persist(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"first");
        // Only the cache file remains, temporaries are cleaned up.
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_entry() {
        let tmp = TempDir::new().unwrap();
        let archive = std::sync::Arc::new(TickArchive::new(
            tmp.path().to_path_buf(),
            Chicago,
            MockSource::serving(Some(sample_archive())),
        ));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let archive = std::sync::Arc::clone(&archive);
                tokio::spawn(async move { archive.get_ticks(date(), &gold(), "04-20").await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().len(), 3);
        }
    }
}
