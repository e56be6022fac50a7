//! Pricelists: rule definitions and the engine that evaluates them.
//!
//! Only product-scoped rules are supported: a fixed price, or a percentage
//! off the product's list price. Quantity breaks, validity dates and
//! category rules are not evaluated.

pub mod engine;
pub mod pricelist;

pub use engine::{PricelistEngine, PricelistPrice, RulePricelistEngine};
pub use pricelist::{DiscountPolicy, Pricelist, PricelistId, PricelistRule, RuleKind};
