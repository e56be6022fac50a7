//! Configuration loading and representation.
//!
//! Sources, later ones winning: built-in defaults, an optional JSON file,
//! then `PRICEDESK_*` environment variables.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pricedesk_core::DomainResult;
use pricedesk_currency::{Currency, CurrencyCode, Precision};
use pricedesk_observability::{LogFormat, LoggingConfig};
use pricedesk_pricelists::{DiscountPolicy, Pricelist, PricelistId};

pub const ENV_REFERENCE_CURRENCY: &str = "PRICEDESK_REFERENCE_CURRENCY";
pub const ENV_CURRENCY_DIGITS: &str = "PRICEDESK_CURRENCY_DIGITS";
pub const ENV_DISCOUNT_DIGITS: &str = "PRICEDESK_DISCOUNT_DIGITS";
pub const ENV_LOG_FORMAT: &str = "PRICEDESK_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            reason: reason.into(),
        }
    }
}

/// Rounding and currency defaults for pricing, plus logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Currency whose exchange rate is 1.
    pub reference_currency: String,
    /// Decimal places for currencies created without an explicit precision.
    pub currency_decimal_places: u32,
    /// Decimal places for discount percentages on new pricelists.
    pub discount_decimal_places: u32,
    pub logging: LoggingConfig,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            reference_currency: "EUR".to_string(),
            currency_decimal_places: 2,
            discount_decimal_places: 2,
            logging: LoggingConfig::default(),
        }
    }
}

impl PricingConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Load a JSON file, then apply environment overrides.
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading pricing config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing pricing config {}", path.display()))?;
        let config = config
            .with_overrides(|key| std::env::var(key).ok())
            .context("applying environment overrides")?;

        tracing::info!(path = %path.display(), "pricing config loaded");
        Ok(config)
    }

    /// Apply overrides from `lookup` (usually the environment) and validate.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(code) = lookup(ENV_REFERENCE_CURRENCY) {
            self.reference_currency = code;
        }
        if let Some(raw) = lookup(ENV_CURRENCY_DIGITS) {
            self.currency_decimal_places = parse_digits(ENV_CURRENCY_DIGITS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DISCOUNT_DIGITS) {
            self.discount_decimal_places = parse_digits(ENV_DISCOUNT_DIGITS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            self.logging.format = raw
                .parse::<LogFormat>()
                .map_err(|reason| ConfigError::invalid(ENV_LOG_FORMAT, reason))?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        CurrencyCode::new(&self.reference_currency)
            .map_err(|e| ConfigError::invalid("reference_currency", e.to_string()))?;
        Precision::new(self.currency_decimal_places)
            .map_err(|e| ConfigError::invalid("currency_decimal_places", e.to_string()))?;
        Precision::new(self.discount_decimal_places)
            .map_err(|e| ConfigError::invalid("discount_decimal_places", e.to_string()))?;
        Ok(())
    }

    pub fn reference_currency(&self) -> DomainResult<CurrencyCode> {
        CurrencyCode::new(&self.reference_currency)
    }

    pub fn currency_precision(&self) -> DomainResult<Precision> {
        Precision::new(self.currency_decimal_places)
    }

    pub fn discount_precision(&self) -> DomainResult<Precision> {
        Precision::new(self.discount_decimal_places)
    }

    /// A currency using the configured default precision.
    pub fn currency(&self, code: &str, name: &str) -> DomainResult<Currency> {
        Ok(Currency::new(CurrencyCode::new(code)?, name, self.currency_precision()?))
    }

    /// An empty pricelist using the configured discount precision.
    pub fn pricelist(
        &self,
        id: PricelistId,
        name: &str,
        currency: CurrencyCode,
        policy: DiscountPolicy,
    ) -> DomainResult<Pricelist> {
        let precision = self.discount_precision()?;
        Ok(Pricelist::new(id, name, currency, policy)?.with_discount_precision(precision))
    }
}

fn parse_digits(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|e| ConfigError::invalid(key, format!("{raw:?}: {e}")))
}
