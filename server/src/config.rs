//! Server configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use currencies_common::{constants, DurationExt};
use currencies_fx::provider::OPEN_EXCHANGE_RATES_URL;
use currencies_fx::{AssetRegistry, FxEngineConfig, FxResult, ProviderConfig, UnknownCurrencyPolicy};
use thiserror::Error;

/// Environment variable holding the provider token.
pub const APP_ID_VAR: &str = "OPENEXCHANGERATES_APP_ID";

/// Errors raised while building the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set or blank.
    #[error("{0} environment variable is not set")]
    MissingVariable(&'static str),

    /// A variable is set to something unparsable.
    #[error("Invalid value '{value}' for {variable}: {reason}")]
    InvalidValue {
        variable: &'static str,
        value: String,
        reason: String,
    },

    /// Values parse but do not make sense together.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How engine failure kinds become HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStatusPolicy {
    /// Every failure is a `400 Bad Request`.
    #[default]
    Uniform,
    /// Upstream failures become `502 Bad Gateway`.
    ByKind,
}

impl FromStr for ErrorStatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bad_request" | "uniform" => Ok(Self::Uniform),
            "bad_gateway" | "by_kind" => Ok(Self::ByKind),
            other => Err(format!("unknown error status policy '{}'", other)),
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Rate provider app ID.
    pub app_id: String,
    /// Rate provider API root.
    pub provider_base_url: String,
    /// Rate provider request timeout.
    pub provider_timeout: Duration,
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// Handling of currencies the provider does not quote.
    pub unknown_currency_policy: UnknownCurrencyPolicy,
    /// Status mapping for engine failures.
    pub error_status: ErrorStatusPolicy,
    /// JSON asset table replacing the built-in one.
    pub asset_registry_path: Option<PathBuf>,
    /// Serve `/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            app_id: String::new(),
            provider_base_url: OPEN_EXCHANGE_RATES_URL.to_string(),
            provider_timeout: constants::provider_timeout().as_std(),
            log_level: "info".to_string(),
            unknown_currency_policy: UnknownCurrencyPolicy::default(),
            error_status: ErrorStatusPolicy::default(),
            asset_registry_path: None,
            metrics_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, reading `.env` first
    /// when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.app_id = lookup(APP_ID_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVariable(APP_ID_VAR))?;

        if let Some(url) = lookup("OPENEXCHANGERATES_BASE_URL") {
            config.provider_base_url = url;
        }

        if let Some(secs) = lookup("PROVIDER_TIMEOUT_SECS") {
            let secs: u64 = parse_var("PROVIDER_TIMEOUT_SECS", &secs)?;
            config.provider_timeout = Duration::from_secs(secs);
        }

        if let Some(addr) = lookup("LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = lookup("LISTEN_PORT") {
            config.listen_port = parse_var("LISTEN_PORT", &port)?;
        }

        config.log_level = log_level_for(lookup("ENVIRONMENT").as_deref()).to_string();

        if let Some(policy) = lookup("UNKNOWN_CURRENCY_POLICY") {
            config.unknown_currency_policy = parse_var("UNKNOWN_CURRENCY_POLICY", &policy)?;
        }

        if let Some(policy) = lookup("UPSTREAM_ERROR_STATUS") {
            config.error_status = parse_var("UPSTREAM_ERROR_STATUS", &policy)?;
        }

        if let Some(path) = lookup("ASSET_REGISTRY_PATH").filter(|p| !p.trim().is_empty()) {
            config.asset_registry_path = Some(PathBuf::from(path));
        }

        if let Some(enabled) = lookup("METRICS_ENABLED") {
            config.metrics_enabled = parse_var("METRICS_ENABLED", &enabled)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.is_empty() {
            return Err(ConfigError::MissingVariable(APP_ID_VAR));
        }

        if self.listen_port == 0 {
            return Err(ConfigError::Invalid("Listen port cannot be 0".to_string()));
        }

        if self.provider_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "Provider timeout cannot be 0".to_string(),
            ));
        }

        if !self.provider_base_url.starts_with("http://")
            && !self.provider_base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "Provider URL must be http(s): {}",
                self.provider_base_url
            )));
        }

        Ok(())
    }

    /// `addr:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(self.app_id.clone())
            .with_base_url(self.provider_base_url.clone())
            .with_timeout(self.provider_timeout)
    }

    pub fn engine_config(&self) -> FxEngineConfig {
        FxEngineConfig {
            unknown_currency_policy: self.unknown_currency_policy,
        }
    }

    /// The asset table from `asset_registry_path`, or the built-in one.
    pub fn load_assets(&self) -> FxResult<AssetRegistry> {
        match &self.asset_registry_path {
            Some(path) => AssetRegistry::from_path(path),
            None => Ok(AssetRegistry::builtin()),
        }
    }
}

/// Log filter for a deployment environment name.
pub fn log_level_for(environment: Option<&str>) -> &'static str {
    match environment {
        Some("PRODUCTION") => "warn",
        Some("DEBUG") => "debug",
        _ => "info",
    }
}

fn parse_var<T>(variable: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            variable,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
