//! Client error types.

use std::path::PathBuf;

use sbpro_archive::ArchiveError;
use sbpro_catalog::CatalogError;
use sbpro_types::SymbolError;
use sbpro_wire::BulkError;
use thiserror::Error;

/// Errors surfaced by [`Client`](crate::Client) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The symbol is not in the catalog.
    #[error("symbol {0} is not available")]
    UnknownSymbol(String),

    /// The symbol cannot scale prices.
    #[error("tick cost {tick_cost} of {symbol} must be positive")]
    InvalidTickCost {
        /// Symbol name.
        symbol: String,
        /// Catalogued tick cost.
        tick_cost: i32,
    },

    /// The symbol has no usable contracts.
    #[error(transparent)]
    Symbol(#[from] SymbolError),

    /// The catalog payload is malformed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The catalog payload is not UTF-8.
    #[error("catalog payload is not valid UTF-8")]
    CatalogEncoding,

    /// The catalog exchange failed.
    #[error("catalog request failed: {0}")]
    Bulk(#[from] BulkError),

    /// Loading history for one symbol failed.
    #[error("history for {symbol} failed: {source}")]
    History {
        /// Symbol name.
        symbol: String,
        /// Underlying archive error.
        #[source]
        source: ArchiveError,
    },

    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`ClientConfig`](crate::ClientConfig).
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        /// Config file path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The configured log level is not a tracing level.
    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),

    /// Flushing or closing a log sink failed.
    #[error("log sink error: {0}")]
    LogSink(#[source] std::io::Error),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
