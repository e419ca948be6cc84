//! USD-pivoted rate table.

use std::collections::HashMap;

use currencies_common::{Currency, Timestamp};

use crate::error::{FxError, FxResult};

/// Rates of currencies against the pivot: one USD buys `rate` units.
///
/// The pivot itself is always present with rate 1.0 whether or not the
/// source listed it.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<Currency, f64>,
    quoted_at: Option<Timestamp>,
}

impl RateTable {
    /// Build a table, rejecting zero, negative and non-finite rates.
    pub fn new<I, C>(rates: I) -> FxResult<Self>
    where
        I: IntoIterator<Item = (C, f64)>,
        C: Into<Currency>,
    {
        let mut table = HashMap::new();
        for (code, rate) in rates {
            let currency = code.into();
            if !rate.is_finite() || rate <= 0.0 {
                return Err(FxError::InvalidRate { currency, rate });
            }
            table.insert(currency, rate);
        }

        Ok(Self {
            rates: table,
            quoted_at: None,
        })
    }

    /// Attach the time the source quoted these rates.
    pub fn with_quoted_at(mut self, quoted_at: Timestamp) -> Self {
        self.quoted_at = Some(quoted_at);
        self
    }

    /// Rate of `currency` against the pivot.
    pub fn rate_of(&self, currency: &Currency) -> Option<f64> {
        if currency.is_pivot() {
            return Some(1.0);
        }
        self.rates.get(currency).copied()
    }

    /// When the source quoted these rates, if it said.
    pub fn quoted_at(&self) -> Option<Timestamp> {
        self.quoted_at
    }

    /// Number of explicitly listed currencies.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
