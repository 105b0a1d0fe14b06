//! Disk-backed historical tick archive cache for the sbpro market-data feed.
//!
//! - [`TickArchive`] - Cache front-end: path layout, fetch-on-miss, decoding
//! - [`ArchiveSource`] - Where archives come from on a cache miss
//! - [`TcpArchiveSource`] - The archive server over TCP
//! - [`ArchiveKey`] - (symbol, contract, trading date) cache key

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod error;
mod source;

pub use cache::{ARCHIVE_EXTENSION, TickArchive, read_archive};
pub use error::{ArchiveError, Result};
pub use source::{ArchiveKey, ArchiveSource, TcpArchiveSource};
