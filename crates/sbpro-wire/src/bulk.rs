//! Bulk exchanges: the gzip catalog request and the archive download.
//!
//! Both exchanges run on a fresh connection each time. The catalog exchange
//! is gzip-compressed end to end and enveloped in `<ms>…</me>`. The archive
//! exchange is a short text handshake in `<st>…</st>` frames followed by a
//! raw payload of exactly the announced size:
//!
//! ```text
//! client: <st>ticksx:GC:04-20:20200101</st>
//! server: <st>1234</st>          (or <st>no_file</st>)
//! client: <st>ready</st>
//! server: 1234 raw bytes
//! ```

use std::io::{Read, Write};

use chrono::NaiveDate;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::BulkError;

/// Envelope prefix of the catalog exchange.
pub const CATALOG_PREFIX: &str = "<ms>";
/// Envelope suffix of the catalog exchange.
pub const CATALOG_SUFFIX: &str = "</me>";
/// Frame prefix of the archive handshake.
pub const ARCHIVE_PREFIX: &str = "<st>";
/// Frame suffix of the archive handshake.
pub const ARCHIVE_SUFFIX: &str = "</st>";
/// Announcement meaning no archive exists for the requested key.
pub const NO_FILE: &str = "no_file";
/// Acknowledgment sent before the archive payload.
pub const READY: &str = "ready";
/// Upper bound on the size announcement frame.
pub const MAX_ANNOUNCEMENT_LEN: usize = 1024;

/// Wraps `payload` in an envelope.
#[must_use]
pub fn wrap(prefix: &str, payload: &str, suffix: &str) -> String {
    format!("{prefix}{payload}{suffix}")
}

/// Removes `prefix` and `suffix` if present.
#[must_use]
pub fn strip_envelope<'a>(data: &'a [u8], prefix: &str, suffix: &str) -> &'a [u8] {
    let data = data.strip_prefix(prefix.as_bytes()).unwrap_or(data);
    data.strip_suffix(suffix.as_bytes()).unwrap_or(data)
}

/// gzip-compresses `data`.
///
/// # Errors
///
/// Returns an error if compression fails.
pub fn gzip(data: &[u8]) -> Result<Vec<u8>, BulkError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(BulkError::Gzip)?;
    encoder.finish().map_err(BulkError::Gzip)
}

/// Decompresses a (possibly multi-member) gzip stream.
///
/// # Errors
///
/// Returns an error if `data` is not valid gzip.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, BulkError> {
    let mut decompressed = Vec::new();
    MultiGzDecoder::new(data)
        .read_to_end(&mut decompressed)
        .map_err(BulkError::Gzip)?;
    Ok(decompressed)
}

/// Runs the catalog exchange on an open stream.
///
/// Sends the gzip-compressed, enveloped `command`, reads the gzip response
/// until the server closes the connection, and returns the decompressed
/// payload with its envelope removed.
///
/// # Errors
///
/// Returns an error on I/O failure or invalid gzip data.
pub async fn catalog_exchange<S>(stream: &mut S, command: &str) -> Result<Vec<u8>, BulkError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = gzip(wrap(CATALOG_PREFIX, command, CATALOG_SUFFIX).as_bytes())?;
    stream.write_all(&request).await?;
    stream.flush().await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    debug!(compressed = response.len(), "catalog response received");

    let decompressed = gunzip(&response)?;
    Ok(strip_envelope(&decompressed, CATALOG_PREFIX, CATALOG_SUFFIX).to_vec())
}

/// Connects to the catalog server and runs [`catalog_exchange`].
///
/// # Errors
///
/// Returns an error if the connection or the exchange fails.
pub async fn request_catalog(addr: &str, command: &str) -> Result<Vec<u8>, BulkError> {
    let mut stream = TcpStream::connect(addr).await?;
    catalog_exchange(&mut stream, command).await
}

/// Server reply to an archive request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeAnnouncement {
    /// No archive exists for the key.
    NoFile,
    /// The payload that follows has this many bytes.
    Bytes(usize),
}

impl SizeAnnouncement {
    /// Parses the unwrapped announcement text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is neither `no_file` nor a decimal count.
    pub fn parse(text: &str) -> Result<Self, BulkError> {
        if text == NO_FILE {
            return Ok(Self::NoFile);
        }
        text.parse()
            .map(Self::Bytes)
            .map_err(|_| BulkError::InvalidAnnouncement(text.to_string()))
    }
}

/// Builds the archive request for one trading day.
///
/// ```
/// use chrono::NaiveDate;
/// use sbpro_wire::bulk::archive_request;
///
/// let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
/// assert_eq!(archive_request("GC", "04-20", date), "ticksx:GC:04-20:20200101");
/// ```
#[must_use]
pub fn archive_request(symbol: &str, contract: &str, date: NaiveDate) -> String {
    format!("ticksx:{symbol}:{contract}:{}", date.format("%Y%m%d"))
}

/// Runs the archive download on an open stream.
///
/// Returns `None` when the server has no data for the key (`no_file` or a
/// zero-byte announcement), otherwise exactly the announced bytes.
///
/// # Errors
///
/// Returns an error on I/O failure, a malformed announcement, or a
/// connection closed before the full payload arrived.
pub async fn archive_exchange<S>(
    stream: &mut S,
    request: &str,
) -> Result<Option<Vec<u8>>, BulkError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(wrap(ARCHIVE_PREFIX, request, ARCHIVE_SUFFIX).as_bytes())
        .await?;

    let (announcement, mut payload) = read_announcement(stream).await?;
    let size = match SizeAnnouncement::parse(&announcement)? {
        SizeAnnouncement::NoFile | SizeAnnouncement::Bytes(0) => return Ok(None),
        SizeAnnouncement::Bytes(size) => size,
    };
    debug!(request, size, "archive announced");

    stream
        .write_all(wrap(ARCHIVE_PREFIX, READY, ARCHIVE_SUFFIX).as_bytes())
        .await?;

    // The buffer grows with what arrives, never with the announcement.
    payload.truncate(size);
    let remaining = u64::try_from(size - payload.len()).unwrap_or(u64::MAX);
    (&mut *stream).take(remaining).read_to_end(&mut payload).await?;
    if payload.len() < size {
        return Err(BulkError::Closed("archive download"));
    }

    Ok(Some(payload))
}

/// Connects to the archive server and runs [`archive_exchange`].
///
/// # Errors
///
/// Returns an error if the connection or the exchange fails.
pub async fn request_archive(addr: &str, request: &str) -> Result<Option<Vec<u8>>, BulkError> {
    let mut stream = TcpStream::connect(addr).await?;
    archive_exchange(&mut stream, request).await
}

/// Reads one `<st>…</st>` frame, returning its text and any bytes read past it.
async fn read_announcement<S>(stream: &mut S) -> Result<(String, Vec<u8>), BulkError>
where
    S: AsyncRead + Unpin,
{
    let suffix = ARCHIVE_SUFFIX.as_bytes();
    let mut buf = Vec::with_capacity(64);
    let mut chunk = [0u8; 256];

    loop {
        if let Some(pos) = buf.windows(suffix.len()).position(|w| w == suffix) {
            let rest = buf.split_off(pos + suffix.len());
            let frame = strip_envelope(&buf, ARCHIVE_PREFIX, ARCHIVE_SUFFIX);
            return Ok((String::from_utf8_lossy(frame).trim().to_string(), rest));
        }
        if buf.len() > MAX_ANNOUNCEMENT_LEN {
            return Err(BulkError::AnnouncementTooLong(MAX_ANNOUNCEMENT_LEN));
        }

        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(BulkError::Closed("size announcement"));
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}
