//! Rust client library for the sbpro futures and forex tick feed.
//!
//! This is a facade crate that re-exports functionality from the sbpro
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use sbpro_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("my-key", ClientConfig::default()).await?;
//!
//!     let history = client.load_history(chrono::Utc::now()).await?;
//!     println!("Loaded {} archived ticks", history.len());
//!
//!     let mut stream = client.stream_live("6E").await?;
//!     while let Some(tick) = stream.recv().await {
//!         println!("{} {} {} {}", tick.contract, tick.time, tick.cost, tick.direction);
//!     }
//!
//!     client.close()?;
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use sbpro_types::*;

// Re-export the catalog
pub use sbpro_catalog::{Catalog, CatalogError, parse_symbol};

// Re-export codecs
#[cfg(feature = "wire")]
pub use sbpro_wire::{
    BulkError, DecodeError, DelimitedCodec, FrameError, StreamResponse, TickBatch, bulk,
    decode_archive_tick, decode_live_tick, decode_stream_response, poll_request,
};

// Re-export the archive cache
#[cfg(feature = "archive")]
pub use sbpro_archive::{ArchiveError, ArchiveKey, ArchiveSource, TcpArchiveSource, TickArchive};

// Re-export the client
#[cfg(feature = "client")]
pub use sbpro_client::{
    Client, ClientBuilder, ClientConfig, ClientError, LiveStream, LogSink, SessionExit,
    SessionState, StreamingSession,
};

/// Prelude module for convenient imports.
///
/// ```
/// use sbpro_lib::prelude::*;
/// ```
pub mod prelude {
    pub use sbpro_types::{Contract, Direction, Symbol, Tick};

    pub use sbpro_catalog::Catalog;

    #[cfg(feature = "wire")]
    pub use sbpro_wire::{StreamResponse, TickBatch};

    #[cfg(feature = "archive")]
    pub use sbpro_archive::{ArchiveSource, TickArchive};

    #[cfg(feature = "client")]
    pub use sbpro_client::{Client, ClientConfig, ClientError, LiveStream, LogSink};
}
