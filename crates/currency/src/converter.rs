use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use pricedesk_core::{CompanyId, DomainError, DomainResult};

use crate::currency::{Currency, CurrencyCode};
use crate::rate::RateTable;

/// Converts amounts between currencies at a company- and date-scoped rate.
pub trait CurrencyConverter: Send + Sync {
    /// Convert `amount` from `from` to `to`, without rounding.
    ///
    /// Converting a currency into itself returns `amount` unchanged and never
    /// needs a rate.
    fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<Decimal>;

    /// Convert and round to the precision of the target currency.
    fn convert_rounded(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &Currency,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<Decimal> {
        let converted = self.convert(amount, from, &to.code, company, date)?;
        Ok(to.round(converted))
    }
}

impl CurrencyConverter for RateTable {
    fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<Decimal> {
        if from == to {
            return Ok(amount);
        }

        let from_rate = self.rate_on(from, company, date)?;
        let to_rate = self.rate_on(to, company, date)?;

        let converted = amount
            .checked_mul(to_rate)
            .and_then(|v| v.checked_div(from_rate))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "converting {amount} {from} to {to} overflows"
                ))
            })?;

        tracing::trace!(%amount, %from, %to, %date, %converted, "converted amount");
        Ok(converted)
    }
}

impl<C> CurrencyConverter for Arc<C>
where
    C: CurrencyConverter + ?Sized,
{
    fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<Decimal> {
        (**self).convert(amount, from, to, company, date)
    }
}

impl<C> CurrencyConverter for &C
where
    C: CurrencyConverter + ?Sized,
{
    fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<Decimal> {
        (**self).convert(amount, from, to, company, date)
    }
}
