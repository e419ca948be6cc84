//! Crypto asset conversion.

use currencies_common::{Currency, CurrencyPair};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FxError, FxResult};
use crate::registry::{AssetLookup, AssetRegistry};

/// Outcome of converting an amount between two assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub from: Currency,
    pub to: Currency,
    /// Converted amount, rounded to the target asset's decimal places.
    pub amount: f64,
}

impl ConversionResult {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from.clone(), self.to.clone())
    }
}

/// Converts amounts between assets known to an [`AssetLookup`].
#[derive(Debug, Clone)]
pub struct CryptoConverter<L = AssetRegistry> {
    assets: L,
}

impl<L: AssetLookup> CryptoConverter<L> {
    pub fn new(assets: L) -> Self {
        Self { assets }
    }

    pub fn assets(&self) -> &L {
        &self.assets
    }

    /// Convert `amount` units of `from` into `to`.
    pub fn convert(&self, from: &Currency, to: &Currency, amount: f64) -> FxResult<ConversionResult> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(FxError::InvalidAmount(amount.to_string()));
        }

        let from_entry = self
            .assets
            .resolve(from)
            .ok_or_else(|| FxError::UnknownAsset(from.clone()))?;
        let to_entry = self
            .assets
            .resolve(to)
            .ok_or_else(|| FxError::UnknownAsset(to.clone()))?;

        let rate = from_entry.usd_rate / to_entry.usd_rate;
        let converted = round_to_decimal_places(amount * rate, to_entry.decimal_places);
        if !converted.is_finite() {
            return Err(FxError::AmountOutOfRange(amount.to_string()));
        }

        let result = ConversionResult {
            from: from_entry.symbol.clone(),
            to: to_entry.symbol.clone(),
            amount: converted,
        };

        debug!(
            pair = %result.pair(),
            rate,
            amount,
            converted,
            "Converted asset amount"
        );

        Ok(result)
    }
}

/// Parse an amount from its query-string form. Accepts anything Rust parses
/// as `f64` that is finite and not negative.
pub fn parse_amount(raw: &str) -> FxResult<f64> {
    let trimmed = raw.trim();
    let amount: f64 = trimmed
        .parse()
        .map_err(|_| FxError::InvalidAmount(raw.to_string()))?;

    if !amount.is_finite() || amount < 0.0 {
        return Err(FxError::InvalidAmount(raw.to_string()));
    }

    // "-0" parses as negative zero
    Ok(if amount == 0.0 { 0.0 } else { amount })
}

/// From this magnitude on a scaled `f64` has no fractional part left to round.
const EXACT_SCALED_LIMIT: f64 = 4_503_599_627_370_496.0; // 2^52

/// Round half away from zero at `decimal_places` fractional digits.
///
/// A value that already is the closest `f64` to a multiple of
/// `10^-decimal_places` comes back unchanged, as does one too large for the
/// scale to hold fractional digits, so rounding twice gives the same result.
pub fn round_to_decimal_places(value: f64, decimal_places: u32) -> f64 {
    let scale = 10f64.powi(decimal_places.min(i32::MAX as u32) as i32);
    let scaled = value * scale;
    if !scale.is_finite() || !scaled.is_finite() || scaled.abs() >= EXACT_SCALED_LIMIT {
        return value;
    }

    if scaled.floor() / scale == value || scaled.ceil() / scale == value {
        return value;
    }
    scaled.round() / scale
}
