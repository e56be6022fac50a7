use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use pricedesk_core::{CompanyId, DomainError, DomainResult};
use pricedesk_currency::{Currency, CurrencyCode, CurrencyConverter, CurrencyRate, RateTable};
use pricedesk_invoicing::MasterData;
use pricedesk_parties::{Party, PartyId};
use pricedesk_pricelists::{Pricelist, PricelistId};
use pricedesk_products::{Product, ProductId};

use crate::config::PricingConfig;

/// In-memory master data store.
///
/// Intended for tests/dev. Readers get cloned snapshots, so a pricing run is
/// unaffected by writes that happen while it is in progress.
#[derive(Debug)]
pub struct InMemoryMasterData {
    products: RwLock<HashMap<ProductId, Product>>,
    pricelists: RwLock<HashMap<PricelistId, Pricelist>>,
    parties: RwLock<HashMap<PartyId, Party>>,
    currencies: RwLock<HashMap<CurrencyCode, Currency>>,
    rates: RwLock<RateTable>,
}

fn read<T>(lock: &RwLock<T>) -> DomainResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| DomainError::invariant("master data lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> DomainResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| DomainError::invariant("master data lock poisoned"))
}

impl InMemoryMasterData {
    /// Empty store whose exchange rates are relative to `reference`.
    pub fn new(reference: Currency) -> Self {
        let rates = RateTable::new(reference.code.clone());
        let mut currencies = HashMap::new();
        currencies.insert(reference.code.clone(), reference);

        Self {
            products: RwLock::new(HashMap::new()),
            pricelists: RwLock::new(HashMap::new()),
            parties: RwLock::new(HashMap::new()),
            currencies: RwLock::new(currencies),
            rates: RwLock::new(rates),
        }
    }

    pub fn from_config(config: &PricingConfig) -> DomainResult<Self> {
        let code = config.reference_currency()?;
        let reference = Currency::new(code.clone(), code.as_str(), config.currency_precision()?);
        Ok(Self::new(reference))
    }

    pub fn upsert_currency(&self, currency: Currency) -> DomainResult<()> {
        write(&self.currencies)?.insert(currency.code.clone(), currency);
        Ok(())
    }

    pub fn add_rate(&self, rate: CurrencyRate) -> DomainResult<()> {
        let currency = rate.currency.clone();
        if !read(&self.currencies)?.contains_key(&currency) {
            return Err(DomainError::not_found(format!("currency {currency}")));
        }
        write(&self.rates)?.add_rate(rate)
    }

    pub fn upsert_product(&self, product: Product) -> DomainResult<()> {
        if !product.is_created() {
            return Err(DomainError::validation(format!(
                "product {} has no history",
                product.id_typed()
            )));
        }
        if let Some(currency) = product.currency() {
            self.currency(currency)?;
        }
        write(&self.products)?.insert(product.id_typed(), product);
        Ok(())
    }

    pub fn upsert_pricelist(&self, pricelist: Pricelist) -> DomainResult<()> {
        pricelist.validate()?;
        self.currency(pricelist.currency())?;
        write(&self.pricelists)?.insert(pricelist.id_typed(), pricelist);
        Ok(())
    }

    pub fn upsert_party(&self, party: Party) -> DomainResult<()> {
        if !party.is_created() {
            return Err(DomainError::validation(format!(
                "party {} has no history",
                party.id_typed()
            )));
        }
        if let Some(pricelist_id) = party.pricelist_id() {
            self.pricelist(pricelist_id)?;
        }
        write(&self.parties)?.insert(party.id_typed(), party);
        Ok(())
    }
}

impl MasterData for InMemoryMasterData {
    fn product(&self, id: ProductId) -> DomainResult<Product> {
        read(&self.products)?
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    fn pricelist(&self, id: PricelistId) -> DomainResult<Pricelist> {
        read(&self.pricelists)?
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("pricelist {id}")))
    }

    fn party(&self, id: PartyId) -> DomainResult<Party> {
        read(&self.parties)?
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("party {id}")))
    }

    fn currency(&self, code: &CurrencyCode) -> DomainResult<Currency> {
        read(&self.currencies)?
            .get(code)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("currency {code}")))
    }
}

impl CurrencyConverter for InMemoryMasterData {
    fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<Decimal> {
        read(&self.rates)?.convert(amount, from, to, company, date)
    }
}
