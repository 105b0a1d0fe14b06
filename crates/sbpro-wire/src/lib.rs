//! Wire codecs and message framing for the sbpro market-data feed.
//!
//! This crate provides the protocol layer:
//!
//! - [`decode_live_tick`] - Live-feed text tick decoding
//! - [`decode_stream_response`] - Poll response decoding with cursor tracking
//! - [`decode_archive_tick`] - Archive binary record decoding
//! - [`DelimitedCodec`] - `<ms>…</me>` framing for live connections
//! - [`bulk`] - gzip catalog exchange and size-announced archive download

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod archive;
pub mod bulk;
mod error;
mod framing;
mod live;
mod response;

pub use archive::{decode_archive_tick, parse_archive_record, trading_midnight};
pub use error::{BulkError, DecodeError, FrameError};
pub use framing::{BEGIN_MARKER, DelimitedCodec, END_MARKER, encode_frame, scan_frame};
pub use live::{LIVE_FIELD_COUNT, TIMESTAMP_FORMAT, decode_live_tick, direction_from_prices};
pub use response::{
    PLACEHOLDER, SHUTDOWN_SIGNAL, StreamResponse, TickBatch, decode_stream_response, poll_request,
};
