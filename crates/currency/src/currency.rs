use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use pricedesk_core::{DomainError, DomainResult, Entity, ValueObject};

/// Largest scale a `Decimal` can carry.
const MAX_DECIMAL_PLACES: u32 = 28;

/// ISO-style currency code (e.g. "USD", "EUR"), normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl AsRef<str>) -> DomainResult<Self> {
        let code = code.as_ref().trim();
        if code.is_empty() {
            return Err(DomainError::validation("currency code cannot be empty"));
        }
        if !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(format!(
                "currency code must be alphabetic: {code:?}"
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

/// Number of decimal places a value is rounded to.
///
/// Used both for currency amounts and for discount percentages. Midpoints
/// round away from zero (2.345 -> 2.35, -2.345 -> -2.35).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Precision(u32);

impl Precision {
    /// Two decimal places, the usual precision for both money and percentages.
    pub const CENTS: Precision = Precision(2);

    pub fn new(decimal_places: u32) -> DomainResult<Self> {
        if decimal_places > MAX_DECIMAL_PLACES {
            return Err(DomainError::validation(format!(
                "precision of {decimal_places} decimal places exceeds {MAX_DECIMAL_PLACES}"
            )));
        }
        Ok(Self(decimal_places))
    }

    pub fn decimal_places(self) -> u32 {
        self.0
    }

    pub fn round(self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.0, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::CENTS
    }
}

impl TryFrom<u32> for Precision {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Precision> for u32 {
    fn from(value: Precision) -> Self {
        value.0
    }
}

impl ValueObject for Precision {}

/// Currency master data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: CurrencyCode,
    pub name: String,
    /// Rounding applied to amounts expressed in this currency.
    pub precision: Precision,
}

impl Currency {
    pub fn new(code: CurrencyCode, name: impl Into<String>, precision: Precision) -> Self {
        Self {
            code,
            name: name.into(),
            precision,
        }
    }

    pub fn round(&self, amount: Decimal) -> Decimal {
        self.precision.round(amount)
    }
}

impl Entity for Currency {
    type Id = CurrencyCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}
