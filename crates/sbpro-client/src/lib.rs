//! Live streaming and historical loading client for the sbpro market-data feed.
//!
//! - [`Client`] - Catalog owner exposing live streaming and history loading
//! - [`LiveStream`] - Merged tick channel of all live sessions of a symbol
//! - [`StreamingSession`] - Reconnecting poll loop for one contract
//! - [`ClientConfig`] - Server locations, timezone, and timing
//! - [`LogSink`] - Caller-supplied log destination

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod logging;
mod session;

pub use client::{Client, ClientBuilder, LiveStream};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use logging::LogSink;
pub use session::{SessionError, SessionExit, SessionOptions, SessionState, StreamingSession};
