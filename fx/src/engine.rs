//! Main FX engine implementation.

use std::sync::Arc;

use currencies_common::{quote_age, Currency};
use tracing::{debug, info, instrument};

use crate::conversion::{parse_amount, ConversionResult, CryptoConverter};
use crate::cross_rate::{ensure_enough, CrossRate, CrossRateCalculator, UnknownCurrencyPolicy};
use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;
use crate::registry::AssetRegistry;

/// Configuration for the FX engine.
#[derive(Debug, Clone, Default)]
pub struct FxEngineConfig {
    /// Handling of requested currencies the provider does not quote.
    pub unknown_currency_policy: UnknownCurrencyPolicy,
}

/// The main FX engine: fiat cross rates through a provider, crypto
/// conversion through a fixed asset registry.
pub struct FxEngine {
    provider: Arc<dyn RateProvider>,
    calculator: CrossRateCalculator,
    converter: CryptoConverter<AssetRegistry>,
}

impl FxEngine {
    /// Create a new FX engine with the given provider and assets.
    pub fn new(
        provider: Arc<dyn RateProvider>,
        assets: AssetRegistry,
        config: FxEngineConfig,
    ) -> Self {
        Self {
            provider,
            calculator: CrossRateCalculator::new(config.unknown_currency_policy),
            converter: CryptoConverter::new(assets),
        }
    }

    /// Cross rates for every ordered pair of `currencies`, from one fresh
    /// provider fetch. Lists that cannot form a pair fail before the fetch.
    #[instrument(skip(self, currencies), fields(count = currencies.len()))]
    pub async fn cross_rates(&self, currencies: &[Currency]) -> FxResult<Vec<CrossRate>> {
        if currencies.iter().any(Currency::is_empty) {
            return Err(FxError::EmptyCurrencyCode);
        }
        ensure_enough(currencies.len())?;

        let table = self.provider.latest_usd_rates().await?;
        debug!(
            provider = self.provider.name(),
            listed = table.len(),
            quote_age_secs = ?table.quoted_at().map(|t| quote_age(t).num_seconds()),
            "Rate table received"
        );

        let rates = self.calculator.compute(currencies, &table)?;

        info!(rows = rates.len(), "Cross rates computed");

        Ok(rates)
    }

    /// Convert an amount given in its query-string form between two assets.
    #[instrument(skip_all, fields(from = %from, to = %to, amount = %amount))]
    pub fn convert(&self, from: &Currency, to: &Currency, amount: &str) -> FxResult<ConversionResult> {
        let amount = parse_amount(amount)?;
        let result = self.converter.convert(from, to, amount)?;

        info!(amount = result.amount, "Conversion completed");

        Ok(result)
    }

    /// Symbols accepted by [`FxEngine::convert`], sorted.
    pub fn supported_assets(&self) -> Vec<Currency> {
        self.converter.assets().symbols()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}
