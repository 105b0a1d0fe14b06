//! Futures delivery periods.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// A futures delivery period, written `MM-YY` on the wire.
///
/// Ordering is chronological (year first, then month), so the "latest"
/// contract is the maximum. Two-digit years pivot at 1950: `50..=99` map to
/// 19xx and `00..=49` map to 20xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Contract {
    // Field order drives the derived ordering.
    year: u16,
    month: u8,
}

impl Contract {
    /// First year representable as `YY`.
    pub const MIN_YEAR: u16 = 1950;
    /// Last year representable as `YY`.
    pub const MAX_YEAR: u16 = 2049;

    /// Creates a contract from a month (`1..=12`) and a four-digit year.
    ///
    /// # Errors
    ///
    /// Returns an error if the month is out of range or the year cannot be
    /// round-tripped through the two-digit textual form.
    pub const fn new(month: u8, year: u16) -> Result<Self, ContractError> {
        if month < 1 || month > 12 {
            return Err(ContractError::MonthOutOfRange(month));
        }
        if year < Self::MIN_YEAR || year > Self::MAX_YEAR {
            return Err(ContractError::YearOutOfRange(year));
        }
        Ok(Self { year, month })
    }

    /// Returns the delivery month (`1..=12`).
    #[must_use]
    pub const fn month(&self) -> u8 {
        self.month
    }

    /// Returns the four-digit delivery year.
    #[must_use]
    pub const fn year(&self) -> u16 {
        self.year
    }

    /// Expands a two-digit year using the 1950/2050 pivot.
    #[must_use]
    pub const fn expand_year(two_digit: u16) -> u16 {
        if two_digit >= 50 {
            1900 + two_digit
        } else {
            2000 + two_digit
        }
    }
}

/// Sorts contracts latest first.
pub fn sort_descending(contracts: &mut [Contract]) {
    contracts.sort_unstable_by(|a, b| b.cmp(a));
}

impl FromStr for Contract {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('-').collect();
        let [month, year] = fields.as_slice() else {
            return Err(ContractError::FieldCount(fields.len()));
        };

        let month: u8 = month.parse().map_err(|_| ContractError::InvalidNumber {
            field: "month",
            value: (*month).to_string(),
        })?;
        let two_digit: u16 = year.parse().map_err(|_| ContractError::InvalidNumber {
            field: "year",
            value: (*year).to_string(),
        })?;
        if two_digit > 99 {
            return Err(ContractError::InvalidNumber {
                field: "year",
                value: (*year).to_string(),
            });
        }

        Self::new(month, Self::expand_year(two_digit))
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.year % 100)
    }
}

impl TryFrom<String> for Contract {
    type Error = ContractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Contract> for String {
    fn from(contract: Contract) -> Self {
        contract.to_string()
    }
}
