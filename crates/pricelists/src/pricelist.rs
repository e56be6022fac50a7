use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricedesk_core::{AggregateId, DomainError, DomainResult, Entity, ValueObject};
use pricedesk_currency::{CurrencyCode, Precision};
use pricedesk_products::ProductId;

/// Pricelist identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricelistId(pub AggregateId);

impl PricelistId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PricelistId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// How a pricelist presents its computed price on a document line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountPolicy {
    /// Show the computed price as the unit price, with no discount.
    #[default]
    WithDiscount,
    /// Show the list price as the unit price and the difference as a discount.
    WithoutDiscount,
}

/// What a rule computes for its product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "compute_price", rename_all = "snake_case")]
pub enum RuleKind {
    /// A price in the pricelist currency.
    Fixed { price: Decimal },
    /// `percent`% off the product's list price.
    Percentage { percent: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricelistRule {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub kind: RuleKind,
}

impl PricelistRule {
    pub fn fixed(product_id: ProductId, price: Decimal) -> Self {
        Self {
            product_id,
            kind: RuleKind::Fixed { price },
        }
    }

    pub fn percentage(product_id: ProductId, percent: Decimal) -> Self {
        Self {
            product_id,
            kind: RuleKind::Percentage { percent },
        }
    }

    fn validate(&self) -> DomainResult<()> {
        match self.kind {
            RuleKind::Fixed { price } if price.is_sign_negative() => Err(DomainError::validation(
                format!("fixed price for product {} cannot be negative", self.product_id),
            )),
            RuleKind::Percentage { percent } if percent > Decimal::ONE_HUNDRED => {
                Err(DomainError::validation(format!(
                    "percentage for product {} cannot exceed 100, got {percent}",
                    self.product_id
                )))
            }
            _ => Ok(()),
        }
    }
}

impl ValueObject for PricelistRule {}

/// A pricelist: currency, discount policy and an ordered list of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricelist {
    id: PricelistId,
    name: String,
    currency: CurrencyCode,
    #[serde(default)]
    discount_policy: DiscountPolicy,
    /// Rounding applied to derived discount percentages.
    #[serde(default)]
    discount_precision: Precision,
    #[serde(default)]
    rules: Vec<PricelistRule>,
}

impl Pricelist {
    pub fn new(
        id: PricelistId,
        name: impl Into<String>,
        currency: CurrencyCode,
        discount_policy: DiscountPolicy,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("pricelist name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            currency,
            discount_policy,
            discount_precision: Precision::default(),
            rules: Vec::new(),
        })
    }

    /// Append a rule. Rules are evaluated in insertion order.
    pub fn with_rule(mut self, rule: PricelistRule) -> DomainResult<Self> {
        rule.validate()?;
        self.rules.push(rule);
        Ok(self)
    }

    pub fn with_discount_precision(mut self, precision: Precision) -> Self {
        self.discount_precision = precision;
        self
    }

    pub fn id_typed(&self) -> PricelistId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Currency the pricelist's prices are expressed in.
    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn discount_policy(&self) -> DiscountPolicy {
        self.discount_policy
    }

    pub fn discount_precision(&self) -> Precision {
        self.discount_precision
    }

    pub fn rules(&self) -> &[PricelistRule] {
        &self.rules
    }

    /// The rule that applies to `product_id`: the first one in sequence order.
    pub fn rule_for(&self, product_id: ProductId) -> Option<&PricelistRule> {
        self.rules.iter().find(|r| r.product_id == product_id)
    }

    /// Re-check rule constraints, e.g. after deserializing.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("pricelist name cannot be empty"));
        }
        self.rules.iter().try_for_each(PricelistRule::validate)
    }
}

impl Entity for Pricelist {
    type Id = PricelistId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
