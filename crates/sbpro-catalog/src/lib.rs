//! Symbol and contract catalog for the sbpro market-data feed client.
//!
//! The catalog server answers with a flat, `|`-delimited list of symbol
//! records. Each record has the shape `name_reserved_tickCost!c1*c2*...`
//! where every `cN` is a contract in `MM-YY` form.
//!
//! # Example
//!
//! ```
//! use sbpro_catalog::Catalog;
//!
//! let catalog = Catalog::parse("6E_5_100000!03-16*03-17|GC_0_10!04-20").unwrap();
//!
//! let euro = catalog.get("6E").unwrap();
//! assert_eq!(euro.tick_cost(), 100_000);
//! assert_eq!(euro.contracts()[0].to_string(), "03-17");
//! ```

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::collections::HashMap;

use sbpro_types::{Contract, ContractError, Symbol};
use thiserror::Error;

/// Separator between symbol records.
pub const RECORD_SEPARATOR: char = '|';

/// Errors that can occur while parsing the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A record did not split into header and contract list on `!`.
    #[error("expected 2 fields, got {0} in '{1}'")]
    RecordFields(usize, String),

    /// A record header did not have `name_reserved_tickCost` shape.
    #[error("expected 3 header fields, got {0} in '{1}'")]
    HeaderFields(usize, String),

    /// The tick cost was not an integer.
    #[error("invalid tick cost '{value}' for {symbol}")]
    InvalidTickCost {
        /// Symbol whose record was malformed.
        symbol: String,
        /// The offending text.
        value: String,
    },

    /// A contract code failed to parse.
    #[error("invalid contract for {symbol}: {source}")]
    Contract {
        /// Symbol whose record was malformed.
        symbol: String,
        /// The underlying contract error.
        #[source]
        source: ContractError,
    },
}

/// Registry of catalogued symbols, keyed by name.
///
/// Built once and never mutated, so it can be shared across tasks without
/// locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    symbols: HashMap<String, Symbol>,
}

impl Catalog {
    /// Parses the flat catalog encoding.
    ///
    /// Empty records (e.g. from a trailing separator) are skipped. When a
    /// name repeats, the later record wins.
    ///
    /// # Errors
    ///
    /// Returns an error on the first malformed record.
    pub fn parse(data: &str) -> Result<Self, CatalogError> {
        let symbols = data
            .split(RECORD_SEPARATOR)
            .filter(|record| !record.trim().is_empty())
            .map(parse_symbol)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_symbols(symbols))
    }

    /// Builds a catalog from already-parsed symbols.
    #[must_use]
    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let symbols = symbols
            .into_iter()
            .map(|symbol| (symbol.name().to_string(), symbol))
            .collect();
        Self { symbols }
    }

    /// Looks up a symbol by name (case-sensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Returns all symbols in unspecified order.
    pub fn all(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Returns all symbols sorted by name.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Symbol> {
        let mut symbols: Vec<&Symbol> = self.symbols.values().collect();
        symbols.sort_by(|a, b| a.name().cmp(b.name()));
        symbols
    }

    /// Returns all symbol names sorted alphabetically.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the total number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Parses a single `name_reserved_tickCost!c1*c2*...` record.
///
/// # Errors
///
/// Returns an error if the record is malformed or lists no contracts.
pub fn parse_symbol(record: &str) -> Result<Symbol, CatalogError> {
    let fields: Vec<&str> = record.split('!').collect();
    let [header, contracts] = fields.as_slice() else {
        return Err(CatalogError::RecordFields(fields.len(), record.to_string()));
    };

    let header_fields: Vec<&str> = header.split('_').collect();
    let [name, _reserved, tick_cost] = header_fields.as_slice() else {
        return Err(CatalogError::HeaderFields(
            header_fields.len(),
            record.to_string(),
        ));
    };

    let tick_cost: i32 = tick_cost
        .parse()
        .map_err(|_| CatalogError::InvalidTickCost {
            symbol: (*name).to_string(),
            value: (*tick_cost).to_string(),
        })?;

    let contracts = contracts
        .split('*')
        .map(str::parse::<Contract>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CatalogError::Contract {
            symbol: (*name).to_string(),
            source,
        })?;

    Ok(Symbol::new(*name, tick_cost, contracts))
}
