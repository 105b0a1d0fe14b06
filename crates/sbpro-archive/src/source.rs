//! Archive sources consulted on a cache miss.

use async_trait::async_trait;
use chrono::NaiveDate;
use sbpro_wire::BulkError;
use sbpro_wire::bulk::{archive_request, request_archive};

/// Identifies one trading day of one contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveKey {
    /// Symbol name.
    pub symbol: String,
    /// Contract textual id (`MM-YY`).
    pub contract: String,
    /// Trading date in the feed timezone.
    pub date: NaiveDate,
}

impl ArchiveKey {
    /// Creates a new key.
    #[must_use]
    pub fn new(symbol: impl Into<String>, contract: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            contract: contract.into(),
            date,
        }
    }

    /// Returns the archive server request for this key.
    #[must_use]
    pub fn request(&self) -> String {
        archive_request(&self.symbol, &self.contract, self.date)
    }
}

impl std::fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.symbol, self.contract, self.date.format("%Y%m%d"))
    }
}

/// Provider of compressed archive blobs.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Fetches the gzip-compressed archive for `key`.
    ///
    /// Returns `Ok(None)` when the server has no data for the key.
    async fn fetch(&self, key: &ArchiveKey) -> Result<Option<Vec<u8>>, BulkError>;
}

/// The archive server, reached over a fresh TCP connection per fetch.
#[derive(Debug, Clone)]
pub struct TcpArchiveSource {
    addr: String,
}

impl TcpArchiveSource {
    /// Creates a source for the server at `addr` (`host:port`).
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Returns the server address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl ArchiveSource for TcpArchiveSource {
    async fn fetch(&self, key: &ArchiveKey) -> Result<Option<Vec<u8>>, BulkError> {
        request_archive(&self.addr, &key.request()).await
    }
}
