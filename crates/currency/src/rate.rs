use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricedesk_core::{CompanyId, DomainError, DomainResult};

use crate::currency::CurrencyCode;

/// Exchange rate of one currency, effective from `date` onwards.
///
/// `rate` is the number of units of `currency` worth one unit of the
/// reference currency. A rate without a company applies to every company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub currency: CurrencyCode,
    pub company: Option<CompanyId>,
    pub date: NaiveDate,
    pub rate: Decimal,
}

impl CurrencyRate {
    pub fn new(currency: CurrencyCode, date: NaiveDate, rate: Decimal) -> Self {
        Self {
            currency,
            company: None,
            date,
            rate,
        }
    }

    pub fn for_company(mut self, company: CompanyId) -> Self {
        self.company = Some(company);
        self
    }
}

/// Dated rate history for every currency, relative to a reference currency.
///
/// The reference currency has an implicit rate of 1 on every date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    reference: CurrencyCode,
    rates: HashMap<CurrencyCode, Vec<CurrencyRate>>,
}

impl RateTable {
    pub fn new(reference: CurrencyCode) -> Self {
        Self {
            reference,
            rates: HashMap::new(),
        }
    }

    /// Record a rate. A later rate for the same currency, company and date
    /// replaces the earlier one.
    pub fn add_rate(&mut self, rate: CurrencyRate) -> DomainResult<()> {
        if rate.rate <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "{} rate on {} must be positive, got {}",
                rate.currency, rate.date, rate.rate
            )));
        }
        if rate.currency == self.reference {
            return Err(DomainError::validation(format!(
                "{} is the reference currency; its rate is always 1",
                rate.currency
            )));
        }

        let history = self.rates.entry(rate.currency.clone()).or_default();
        history.retain(|r| !(r.date == rate.date && r.company == rate.company));
        history.push(rate);
        history.sort_by_key(|r| r.date);
        Ok(())
    }

    pub fn with_rate(mut self, rate: CurrencyRate) -> DomainResult<Self> {
        self.add_rate(rate)?;
        Ok(self)
    }

    /// Rate of `currency` valid for `company` on `date`.
    ///
    /// Company-specific rates take precedence over global ones; within each
    /// group the latest rate dated on or before `date` applies.
    pub fn rate_on(
        &self,
        currency: &CurrencyCode,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<Decimal> {
        if *currency == self.reference {
            return Ok(Decimal::ONE);
        }

        let history = self.rates.get(currency).map(Vec::as_slice).unwrap_or_default();
        let latest = |scope: Option<CompanyId>| {
            history
                .iter()
                .rev()
                .find(|r| r.company == scope && r.date <= date)
        };

        let found = latest(Some(company)).or_else(|| latest(None));
        match found {
            Some(r) if r.rate > Decimal::ZERO => Ok(r.rate),
            Some(r) => Err(DomainError::configuration(format!(
                "{currency} rate on {} is not positive ({})",
                r.date, r.rate
            ))),
            None => {
                tracing::warn!(%currency, %company, %date, "no exchange rate available");
                Err(DomainError::configuration(format!(
                    "no {currency} exchange rate on or before {date}"
                )))
            }
        }
    }
}
