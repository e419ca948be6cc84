//! Currencies FX Engine
//!
//! Rate computation engine behind the currencies service.
//!
//! # Features
//!
//! - Pairwise fiat cross rates derived from a single USD-pivoted rate table
//! - Crypto asset conversion with per-asset rounding
//! - Pluggable rate providers, with an openexchangerates.org client
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use currencies_fx::{AssetRegistry, FxEngine, FxEngineConfig, OpenExchangeRatesProvider, ProviderConfig};
//! use currencies_common::Currency;
//!
//! let provider = OpenExchangeRatesProvider::new(ProviderConfig::new(app_id))?;
//! let engine = FxEngine::new(Arc::new(provider), AssetRegistry::builtin(), FxEngineConfig::default());
//!
//! // Every ordered pair of USD, EUR and GBP
//! let rates = engine.cross_rates(&Currency::parse_list("USD,EUR,GBP")).await?;
//!
//! // 1000 USDT in WBTC, rounded to 8 places
//! let btc = engine.convert(&Currency::new("USDT"), &Currency::new("WBTC"), "1000")?;
//! ```

pub mod engine;
pub mod provider;
pub mod rate_table;
pub mod cross_rate;
pub mod registry;
pub mod conversion;
pub mod error;

pub use engine::{FxEngine, FxEngineConfig};
pub use provider::{OpenExchangeRatesProvider, ProviderConfig, RateProvider};
#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateProvider;
pub use rate_table::RateTable;
pub use cross_rate::{CrossRate, CrossRateCalculator, UnknownCurrencyPolicy};
pub use registry::{AssetEntry, AssetLookup, AssetRegistry};
pub use conversion::{ConversionResult, CryptoConverter};
pub use error::{FxError, FxResult};
