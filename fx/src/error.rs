//! FX engine error types.

use currencies_common::{Currency, ErrorKind};
use thiserror::Error;

/// Errors that can occur in the FX engine.
#[derive(Debug, Error)]
pub enum FxError {
    /// Cross rates need at least two positions in the currency list.
    #[error("At least two currencies are required, got {count}")]
    TooFewCurrencies { count: usize },

    /// A blank entry in a currency list.
    #[error("Currency list contains an empty code")]
    EmptyCurrencyCode,

    /// Requested currency is not in the rate table.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(Currency),

    /// Requested asset is not in the asset registry.
    #[error("Unknown asset: {0}")]
    UnknownAsset(Currency),

    /// Amount is not a finite, non-negative number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount is valid but its converted value does not fit in an `f64`.
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    /// A rate that is zero, negative, or not finite.
    #[error("Invalid rate {rate} for {currency}")]
    InvalidRate { currency: Currency, rate: f64 },

    /// The same asset symbol appears twice in a registry definition.
    #[error("Duplicate asset: {0}")]
    DuplicateAsset(Currency),

    /// Asset registry definition could not be read or decoded.
    #[error("Invalid asset registry: {0}")]
    InvalidRegistry(String),

    /// Provider could not be reached or timed out.
    #[error("Rate provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider answered with a non-success status.
    #[error("Rate provider returned status {0}")]
    ProviderStatus(u16),

    /// Provider payload could not be decoded or held invalid rates.
    #[error("Malformed rate provider payload: {0}")]
    MalformedPayload(String),

    /// Provider quoted rates against something other than the pivot.
    #[error("Unexpected base currency: {0}")]
    UnexpectedBase(String),
}

impl FxError {
    /// Class of the failure, used by the transport layer to pick a status.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FxError::ProviderUnavailable(_)
            | FxError::ProviderStatus(_)
            | FxError::MalformedPayload(_)
            | FxError::UnexpectedBase(_) => ErrorKind::UpstreamFailure,
            _ => ErrorKind::BadRequest,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::TooFewCurrencies { .. } => "TOO_FEW_CURRENCIES",
            FxError::EmptyCurrencyCode => "EMPTY_CURRENCY_CODE",
            FxError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            FxError::UnknownAsset(_) => "UNKNOWN_ASSET",
            FxError::InvalidAmount(_) => "INVALID_AMOUNT",
            FxError::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
            FxError::InvalidRate { .. } => "INVALID_RATE",
            FxError::DuplicateAsset(_) => "DUPLICATE_ASSET",
            FxError::InvalidRegistry(_) => "INVALID_REGISTRY",
            FxError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            FxError::ProviderStatus(_) => "PROVIDER_STATUS",
            FxError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            FxError::UnexpectedBase(_) => "UNEXPECTED_BASE",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
