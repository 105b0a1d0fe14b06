//! Error types for sbpro value types.

use thiserror::Error;

/// Errors that can occur when parsing or constructing a [`crate::Contract`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// The textual form did not have exactly two `-` separated fields.
    #[error("got {0} fields, expected 2")]
    FieldCount(usize),

    /// A field was not a valid unsigned integer.
    #[error("invalid {field} '{value}'")]
    InvalidNumber {
        /// Which field failed (`month` or `year`).
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// Month outside `1..=12`.
    #[error("wrong month number: {0}")]
    MonthOutOfRange(u8),

    /// Year that cannot be written as `YY` with the 1950/2050 pivot.
    #[error("year {0} is outside the representable range 1950..=2049")]
    YearOutOfRange(u16),
}

/// Errors raised by [`crate::Symbol`] queries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// The symbol has no contracts to choose from.
    #[error("no contracts available for {0}")]
    NoContracts(String),
}
