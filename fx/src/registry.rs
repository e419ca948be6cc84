//! Crypto asset registry.

use std::collections::HashMap;
use std::path::Path;

use currencies_common::Currency;
use serde::{Deserialize, Serialize};

use crate::error::{FxError, FxResult};

/// A supported asset: its display precision and USD rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Asset symbol.
    pub symbol: Currency,
    /// Fractional digits amounts of this asset are rounded to.
    pub decimal_places: u32,
    /// USD value of one unit.
    pub usd_rate: f64,
}

impl AssetEntry {
    pub fn new(symbol: impl Into<Currency>, decimal_places: u32, usd_rate: f64) -> Self {
        Self {
            symbol: symbol.into(),
            decimal_places,
            usd_rate,
        }
    }
}

/// Lookup capability the converter depends on.
pub trait AssetLookup: Send + Sync {
    fn resolve(&self, symbol: &Currency) -> Option<&AssetEntry>;
}

/// Immutable set of supported assets, built once at startup.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    assets: HashMap<Currency, AssetEntry>,
}

impl AssetRegistry {
    /// The assets the service ships with.
    pub fn builtin() -> Self {
        let entries = [
            AssetEntry::new("BEER", 18, 0.00002461),
            AssetEntry::new("FLOKI", 18, 0.0001428),
            AssetEntry::new("GATE", 18, 6.87),
            AssetEntry::new("USDT", 6, 0.999),
            AssetEntry::new("WBTC", 8, 57037.22),
        ];

        Self {
            assets: entries
                .into_iter()
                .map(|entry| (entry.symbol.clone(), entry))
                .collect(),
        }
    }

    /// Build a registry, rejecting invalid rates and duplicate symbols.
    pub fn from_entries(entries: impl IntoIterator<Item = AssetEntry>) -> FxResult<Self> {
        let mut assets = HashMap::new();

        for entry in entries {
            if entry.symbol.is_empty() {
                return Err(FxError::InvalidRegistry("empty asset symbol".to_string()));
            }
            if !entry.usd_rate.is_finite() || entry.usd_rate <= 0.0 {
                return Err(FxError::InvalidRate {
                    currency: entry.symbol,
                    rate: entry.usd_rate,
                });
            }
            if assets.contains_key(&entry.symbol) {
                return Err(FxError::DuplicateAsset(entry.symbol));
            }
            assets.insert(entry.symbol.clone(), entry);
        }

        Ok(Self { assets })
    }

    /// Load from a JSON array of `{symbol, decimal_places, usd_rate}`.
    pub fn from_json_str(json: &str) -> FxResult<Self> {
        let entries: Vec<AssetEntry> =
            serde_json::from_str(json).map_err(|e| FxError::InvalidRegistry(e.to_string()))?;
        Self::from_entries(entries)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FxResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| FxError::InvalidRegistry(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Supported symbols, sorted.
    pub fn symbols(&self) -> Vec<Currency> {
        let mut symbols: Vec<Currency> = self.assets.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AssetLookup for AssetRegistry {
    fn resolve(&self, symbol: &Currency) -> Option<&AssetEntry> {
        self.assets.get(symbol)
    }
}
