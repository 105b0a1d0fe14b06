//! Error types for the archive cache.

use std::path::PathBuf;

use sbpro_wire::{BulkError, DecodeError};
use thiserror::Error;

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors that can occur while fetching, storing or decoding archives.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Failed to create a cache directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a cache file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to open a cache file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache file is not a valid gzip stream.
    #[error("Failed to decompress '{path}': {source}")]
    Decompress {
        /// The corrupt cache file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The decompressed stream ended mid-record.
    #[error("Truncated record in '{path}' at offset {offset}: {len} trailing bytes")]
    TruncatedRecord {
        /// The corrupt cache file.
        path: PathBuf,
        /// Byte offset of the partial record in the decompressed stream.
        offset: u64,
        /// Number of bytes in the partial record.
        len: usize,
    },

    /// A record failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The archive server exchange failed.
    #[error("Archive fetch failed: {0}")]
    Fetch(#[from] BulkError),

    /// A blocking decode task failed to complete.
    #[error("Archive task failed: {0}")]
    Task(String),
}
