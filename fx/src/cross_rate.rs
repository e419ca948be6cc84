//! Pairwise cross rates derived from a USD-pivoted rate table.

use std::str::FromStr;

use currencies_common::Currency;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FxError, FxResult};
use crate::rate_table::RateTable;

/// One unit of `from` buys `rate` units of `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossRate {
    pub from: Currency,
    pub to: Currency,
    pub rate: f64,
}

/// What to do with requested currencies missing from the rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownCurrencyPolicy {
    /// Fail the whole computation.
    #[default]
    Reject,
    /// Drop the currency from the list and log it.
    Omit,
}

impl FromStr for UnknownCurrencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "omit" => Ok(Self::Omit),
            other => Err(format!("unknown currency policy '{}'", other)),
        }
    }
}

/// Computes every ordered pair of a currency list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossRateCalculator {
    policy: UnknownCurrencyPolicy,
}

impl CrossRateCalculator {
    pub fn new(policy: UnknownCurrencyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnknownCurrencyPolicy {
        self.policy
    }

    /// Rates for every ordered pair of positions (i, j), i != j, outer loop
    /// over `i`. Duplicated codes yield duplicated rows.
    pub fn compute(&self, currencies: &[Currency], table: &RateTable) -> FxResult<Vec<CrossRate>> {
        ensure_enough(currencies.len())?;

        let mut resolved = Vec::with_capacity(currencies.len());
        for currency in currencies {
            match table.rate_of(currency) {
                Some(rate) => resolved.push((currency, rate)),
                None => match self.policy {
                    UnknownCurrencyPolicy::Reject => {
                        return Err(FxError::UnknownCurrency(currency.clone()));
                    }
                    UnknownCurrencyPolicy::Omit => {
                        warn!(currency = %currency, "currency not found, omitting");
                    }
                },
            }
        }

        ensure_enough(resolved.len())?;

        let n = resolved.len();
        let mut rates = Vec::with_capacity(n * (n - 1));
        for (i, (from, from_rate)) in resolved.iter().enumerate() {
            for (j, (to, to_rate)) in resolved.iter().enumerate() {
                if i == j {
                    continue;
                }
                rates.push(CrossRate {
                    from: (*from).clone(),
                    to: (*to).clone(),
                    rate: to_rate / from_rate,
                });
            }
        }

        Ok(rates)
    }
}

/// Reject lists too short to form a single pair.
pub fn ensure_enough(count: usize) -> FxResult<()> {
    if count < 2 {
        return Err(FxError::TooFewCurrencies { count });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_table() -> RateTable {
        RateTable::new([("EUR", 1.2), ("GBP", 1.5)]).unwrap()
    }

    fn codes(list: &str) -> Vec<Currency> {
        Currency::parse_list(list)
    }

    fn find(rates: &[CrossRate], from: &str, to: &str) -> f64 {
        rates
            .iter()
            .find(|r| r.from.code() == from && r.to.code() == to)
            .map(|r| r.rate)
            .unwrap()
    }

    #[test]
    fn test_usd_eur_gbp() {
        let calc = CrossRateCalculator::default();
        let rates = calc.compute(&codes("USD,EUR,GBP"), &sample_table()).unwrap();

        assert_eq!(rates.len(), 6);
        assert!(rates.iter().all(|r| r.from != r.to));
        assert!((find(&rates, "USD", "EUR") - 1.2).abs() < 1e-4);
        assert!((find(&rates, "USD", "GBP") - 1.5).abs() < 1e-4);
        assert!((find(&rates, "EUR", "GBP") - 1.5 / 1.2).abs() < 1e-4);
        assert!((find(&rates, "GBP", "EUR") - 1.2 / 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_enumeration_order() {
        let calc = CrossRateCalculator::default();
        let rates = calc.compute(&codes("USD,EUR,GBP"), &sample_table()).unwrap();

        let pairs: Vec<String> = rates.iter().map(|r| format!("{}/{}", r.from, r.to)).collect();
        assert_eq!(
            pairs,
            vec!["USD/EUR", "USD/GBP", "EUR/USD", "EUR/GBP", "GBP/USD", "GBP/EUR"]
        );
    }

    #[test]
    fn test_duplicates_produce_duplicate_rows() {
        let calc = CrossRateCalculator::default();
        let rates = calc.compute(&codes("EUR,EUR,GBP"), &sample_table()).unwrap();

        assert_eq!(rates.len(), 6);
        // EUR at position 0 against EUR at position 1
        assert_eq!(rates[0].from, Currency::eur());
        assert_eq!(rates[0].to, Currency::eur());
        assert_eq!(rates[0].rate, 1.0);
        assert_eq!(rates[1].rate, rates[3].rate);
    }

    #[test]
    fn test_too_few_currencies() {
        let calc = CrossRateCalculator::default();

        let result = calc.compute(&codes("USD"), &sample_table());
        assert!(matches!(result, Err(FxError::TooFewCurrencies { count: 1 })));

        let result = calc.compute(&[], &sample_table());
        assert!(matches!(result, Err(FxError::TooFewCurrencies { count: 0 })));
    }

    #[test]
    fn test_unknown_currency_rejected() {
        let calc = CrossRateCalculator::new(UnknownCurrencyPolicy::Reject);
        let result = calc.compute(&codes("USD,XYZ,EUR"), &sample_table());

        match result {
            Err(FxError::UnknownCurrency(code)) => assert_eq!(code.code(), "XYZ"),
            other => panic!("expected unknown currency, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_currency_omitted() {
        let calc = CrossRateCalculator::new(UnknownCurrencyPolicy::Omit);
        let rates = calc.compute(&codes("USD,XYZ,EUR"), &sample_table()).unwrap();

        assert_eq!(rates.len(), 2);
        assert!(rates.iter().all(|r| r.rate.is_finite() && r.rate > 0.0));
        assert!(rates.iter().all(|r| r.from.code() != "XYZ" && r.to.code() != "XYZ"));
    }

    #[test]
    fn test_omit_leaving_single_currency() {
        let calc = CrossRateCalculator::new(UnknownCurrencyPolicy::Omit);
        let result = calc.compute(&codes("USD,XYZ"), &sample_table());

        assert!(matches!(result, Err(FxError::TooFewCurrencies { count: 1 })));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "reject".parse::<UnknownCurrencyPolicy>(),
            Ok(UnknownCurrencyPolicy::Reject)
        );
        assert_eq!(
            " OMIT ".parse::<UnknownCurrencyPolicy>(),
            Ok(UnknownCurrencyPolicy::Omit)
        );
        assert!("skip".parse::<UnknownCurrencyPolicy>().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let rate = CrossRate {
            from: Currency::usd(),
            to: Currency::eur(),
            rate: 1.2,
        };
        let json = serde_json::to_value(&rate).unwrap();
        assert_eq!(json, serde_json::json!({"from": "USD", "to": "EUR", "rate": 1.2}));
    }

    const CODES: [&str; 6] = ["USD", "EUR", "GBP", "JPY", "CHF", "PLN"];

    fn arb_table() -> impl Strategy<Value = RateTable> {
        proptest::collection::vec(1e-3f64..1e4, CODES.len() - 1).prop_map(|rates| {
            RateTable::new(CODES[1..].iter().copied().zip(rates)).unwrap()
        })
    }

    fn arb_list() -> impl Strategy<Value = Vec<Currency>> {
        proptest::collection::vec(0..CODES.len(), 2..8)
            .prop_map(|idx| idx.into_iter().map(|i| Currency::new(CODES[i])).collect())
    }

    fn close(a: f64, b: f64) -> bool {
        ((a - b) / b).abs() < 1e-6
    }

    proptest! {
        #[test]
        fn prop_row_count(table in arb_table(), list in arb_list()) {
            let rates = CrossRateCalculator::default().compute(&list, &table).unwrap();
            let n = list.len();
            prop_assert_eq!(rates.len(), n * (n - 1));
        }

        #[test]
        fn prop_reciprocal(table in arb_table(), a in 0..CODES.len(), b in 0..CODES.len()) {
            let list = vec![Currency::new(CODES[a]), Currency::new(CODES[b])];
            let rates = CrossRateCalculator::default().compute(&list, &table).unwrap();
            prop_assert!(close(rates[0].rate * rates[1].rate, 1.0));
        }

        #[test]
        fn prop_transitive(
            table in arb_table(),
            a in 0..CODES.len(),
            b in 0..CODES.len(),
            c in 0..CODES.len(),
        ) {
            let list = vec![
                Currency::new(CODES[a]),
                Currency::new(CODES[b]),
                Currency::new(CODES[c]),
            ];
            let rates = CrossRateCalculator::default().compute(&list, &table).unwrap();
            // rows: (0,1) (0,2) (1,0) (1,2) (2,0) (2,1)
            let ab = rates[0].rate;
            let ac = rates[1].rate;
            let bc = rates[3].rate;
            prop_assert!(close(ab * bc, ac));
        }
    }
}
