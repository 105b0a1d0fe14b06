//! Error types for the wire layer.

use thiserror::Error;

/// Errors that can occur while decoding a tick or a response.
///
/// These are format errors and are never retried on their own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A live tick did not have the expected number of `;` fields.
    #[error("unexpected item count: {0}")]
    FieldCount(usize),

    /// A numeric field failed to parse.
    #[error("invalid {field} '{value}'")]
    InvalidNumber {
        /// Name of the field.
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// The timestamp field did not match `yyyyMMdd HHmmss.fff`.
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// The local time does not exist in the feed timezone (DST gap).
    #[error("local time '{0}' does not exist in the feed timezone")]
    NonexistentLocalTime(String),

    /// A poll response was not `header:tickList`.
    #[error("unexpected field count: expected 2 fields, found {count} ({response})")]
    ResponseShape {
        /// Number of `:` separated fields found.
        count: usize,
        /// The full response text.
        response: String,
    },

    /// The archive direction flag was not a known value.
    #[error("unexpected tick direction: {0}")]
    InvalidDirection(u8),

    /// An archive record had the wrong size.
    #[error("expected {expected} byte record, got {actual}")]
    RecordLength {
        /// The required record size.
        expected: usize,
        /// The size that was supplied.
        actual: usize,
    },
}

/// Errors that can occur while reading delimited frames.
#[derive(Error, Debug)]
pub enum FrameError {
    /// The underlying connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was seen.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The frame payload was not valid UTF-8.
    #[error("frame payload is not valid UTF-8")]
    NotUtf8,
}

/// Errors that can occur during a bulk (catalog or archive) exchange.
#[derive(Error, Debug)]
pub enum BulkError {
    /// The underlying connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// gzip compression or decompression failed.
    #[error("gzip error: {0}")]
    Gzip(std::io::Error),

    /// The size announcement was neither a byte count nor `no_file`.
    #[error("invalid size announcement '{0}'")]
    InvalidAnnouncement(String),

    /// The size announcement exceeded the announcement buffer.
    #[error("size announcement longer than {0} bytes")]
    AnnouncementTooLong(usize),

    /// The server closed the connection mid-exchange.
    #[error("server closed the connection during {0}")]
    Closed(&'static str),
}
