//! Catalogued instrument descriptors.

use serde::{Deserialize, Serialize};

use crate::{Contract, SymbolError, sort_descending};

/// An instrument available on the feed.
///
/// Built once from the catalog and read-only afterwards. Contracts are kept
/// latest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Instrument identifier (e.g., "6E", "GC").
    name: String,
    /// Divisor that turns raw integer prices into decimal prices. The
    /// catalog may list zero or negative values.
    tick_cost: i32,
    /// Available contracts, latest first.
    contracts: Vec<Contract>,
}

impl Symbol {
    /// Creates a new symbol, sorting its contracts latest first.
    #[must_use]
    pub fn new(name: impl Into<String>, tick_cost: i32, mut contracts: Vec<Contract>) -> Self {
        sort_descending(&mut contracts);
        Self {
            name: name.into(),
            tick_cost,
            contracts,
        }
    }

    /// Returns the instrument identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw price divisor.
    #[must_use]
    pub const fn tick_cost(&self) -> i32 {
        self.tick_cost
    }

    /// Returns the price divisor as f64 for price calculations.
    #[must_use]
    pub fn divisor_f64(&self) -> f64 {
        f64::from(self.tick_cost)
    }

    /// Returns true if prices can be scaled, which live streaming requires.
    #[must_use]
    pub const fn is_streamable(&self) -> bool {
        self.tick_cost > 0
    }

    /// Returns all contracts, latest first.
    #[must_use]
    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    /// Returns up to `n` of the most recent contracts.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::NoContracts`] if the symbol has no contracts.
    pub fn latest_contracts(&self, n: usize) -> Result<&[Contract], SymbolError> {
        if self.contracts.is_empty() {
            return Err(SymbolError::NoContracts(self.name.clone()));
        }
        Ok(&self.contracts[..n.min(self.contracts.len())])
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (/{})", self.name, self.tick_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(s: &str) -> Contract {
        s.parse().unwrap()
    }

    #[test]
    fn test_symbol_sorts_contracts() {
        let symbol = Symbol::new(
            "6E",
            100_000,
            vec![contract("03-16"), contract("06-17"), contract("03-17")],
        );

        assert_eq!(symbol.name(), "6E");
        assert_eq!(symbol.tick_cost(), 100_000);
        assert_eq!(
            symbol.contracts(),
            &[contract("06-17"), contract("03-17"), contract("03-16")]
        );
    }

    #[test]
    fn test_latest_contracts() {
        let symbol = Symbol::new("GC", 10, vec![contract("04-20"), contract("06-20")]);

        assert_eq!(symbol.latest_contracts(1).unwrap(), &[contract("06-20")]);
        assert_eq!(symbol.latest_contracts(2).unwrap().len(), 2);
        assert_eq!(symbol.latest_contracts(5).unwrap().len(), 2);
    }

    #[test]
    fn test_latest_contracts_empty() {
        let symbol = Symbol::new("CL", 100, Vec::new());
        assert_eq!(
            symbol.latest_contracts(2),
            Err(SymbolError::NoContracts("CL".to_string()))
        );
    }

    #[test]
    fn test_is_streamable() {
        assert!(Symbol::new("GC", 10, Vec::new()).is_streamable());
        assert!(!Symbol::new("GC", 0, Vec::new()).is_streamable());
    }
}
