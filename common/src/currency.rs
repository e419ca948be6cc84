//! Currency and asset codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Code of the pivot currency every provider rate is quoted against.
pub const PIVOT_CURRENCY: &str = "USD";

/// Uppercase currency or asset code (`"EUR"`, `"WBTC"`).
///
/// Fiat codes and crypto symbols share this type; which table a code is
/// looked up in is decided by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code. Surrounding whitespace is dropped
    /// and the code is uppercased.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// True for a code that was blank before normalization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this is the pivot currency.
    pub fn is_pivot(&self) -> bool {
        self.0 == PIVOT_CURRENCY
    }

    /// The pivot currency.
    pub fn usd() -> Self {
        Self::new(PIVOT_CURRENCY)
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    /// Split a comma separated list (`"USD,EUR,GBP"`) preserving order and
    /// duplicates. Blank segments come back as empty codes so the caller
    /// can reject them.
    pub fn parse_list(list: &str) -> Vec<Currency> {
        list.split(',').map(Currency::new).collect()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// An ordered pair of currencies: one unit of `base` priced in `quote`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Currency being priced.
    pub base: Currency,
    /// Pricing currency.
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
