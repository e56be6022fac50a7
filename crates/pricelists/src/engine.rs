use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricedesk_core::{CompanyId, DomainError, DomainResult};
use pricedesk_currency::{CurrencyCode, CurrencyConverter};
use pricedesk_products::Product;

use crate::pricelist::{Pricelist, RuleKind};

/// Unit price computed by a pricelist, before conversion to a document currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricelistPrice {
    pub price: Decimal,
    /// Always the pricelist currency.
    pub currency: CurrencyCode,
}

/// Computes the price a pricelist gives a product.
///
/// Contract:
/// - `quantity <= 0` is rejected with [`DomainError::Validation`];
/// - the returned price is unrounded and expressed in the pricelist currency;
/// - a product without a matching rule gets its list price.
pub trait PricelistEngine: Send + Sync {
    fn get_price(
        &self,
        product: &Product,
        quantity: Decimal,
        pricelist: &Pricelist,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<PricelistPrice>;
}

/// Evaluates product-scoped fixed and percentage rules.
#[derive(Debug, Clone)]
pub struct RulePricelistEngine<C> {
    converter: C,
}

impl<C> RulePricelistEngine<C>
where
    C: CurrencyConverter,
{
    pub fn new(converter: C) -> Self {
        Self { converter }
    }

    fn list_price_in(
        &self,
        product: &Product,
        currency: &CurrencyCode,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<Decimal> {
        let product_currency = product.currency().ok_or_else(|| {
            DomainError::invariant(format!("product {} has no currency", product.id_typed()))
        })?;
        self.converter
            .convert(product.list_price(), product_currency, currency, company, date)
    }
}

impl<C> PricelistEngine for RulePricelistEngine<C>
where
    C: CurrencyConverter,
{
    fn get_price(
        &self,
        product: &Product,
        quantity: Decimal,
        pricelist: &Pricelist,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<PricelistPrice> {
        if quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        if !product.is_created() {
            return Err(DomainError::not_found(format!("product {}", product.id_typed())));
        }

        let currency = pricelist.currency();
        let rule = pricelist.rule_for(product.id_typed()).map(|r| r.kind);
        let price = match rule {
            Some(RuleKind::Fixed { price }) => price,
            Some(RuleKind::Percentage { percent }) => {
                let base = self.list_price_in(product, currency, company, date)?;
                base.checked_mul(percent)
                    .and_then(|off| off.checked_div(Decimal::ONE_HUNDRED))
                    .and_then(|off| base.checked_sub(off))
                    .ok_or_else(|| {
                        DomainError::validation(format!(
                            "{percent}% off {base} {currency} overflows"
                        ))
                    })?
            }
            None => self.list_price_in(product, currency, company, date)?,
        };

        tracing::debug!(
            product = %product.id_typed(),
            pricelist = %pricelist.id_typed(),
            ?rule,
            %price,
            %currency,
            "pricelist price computed"
        );

        Ok(PricelistPrice {
            price,
            currency: currency.clone(),
        })
    }
}

impl<E> PricelistEngine for Arc<E>
where
    E: PricelistEngine + ?Sized,
{
    fn get_price(
        &self,
        product: &Product,
        quantity: Decimal,
        pricelist: &Pricelist,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<PricelistPrice> {
        (**self).get_price(product, quantity, pricelist, company, date)
    }
}

impl<E> PricelistEngine for &E
where
    E: PricelistEngine + ?Sized,
{
    fn get_price(
        &self,
        product: &Product,
        quantity: Decimal,
        pricelist: &Pricelist,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<PricelistPrice> {
        (**self).get_price(product, quantity, pricelist, company, date)
    }
}
