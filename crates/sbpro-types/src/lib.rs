//! Core types for the sbpro market-data feed client.
//!
//! This crate provides the fundamental data structures used throughout sbpro:
//!
//! - [`Contract`] - A futures delivery period (`MM-YY`)
//! - [`Symbol`] - Instrument descriptor with price divisor and contracts
//! - [`Tick`] - Canonical decoded market event
//! - [`Direction`] - Ask/Bid side of a tick
//! - [`ArchiveRecord`] - Raw 26-byte archive record before normalization

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod contract;
mod error;
mod symbol;
mod tick;

pub use contract::{Contract, sort_descending};
pub use error::{ContractError, SymbolError};
pub use symbol::Symbol;
pub use tick::{ArchiveRecord, Direction, Tick};
