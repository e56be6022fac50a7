//! Read access to master data.

use std::sync::Arc;

use pricedesk_core::DomainResult;
use pricedesk_currency::{Currency, CurrencyCode};
use pricedesk_parties::{Party, PartyId};
use pricedesk_pricelists::{Pricelist, PricelistId};
use pricedesk_products::{Product, ProductId};

/// Point-in-time lookups of the records invoice pricing reads.
///
/// Every method returns an owned snapshot, or [`pricedesk_core::DomainError::NotFound`]
/// when the record does not exist.
pub trait MasterData: Send + Sync {
    fn product(&self, id: ProductId) -> DomainResult<Product>;

    fn pricelist(&self, id: PricelistId) -> DomainResult<Pricelist>;

    fn party(&self, id: PartyId) -> DomainResult<Party>;

    fn currency(&self, code: &CurrencyCode) -> DomainResult<Currency>;
}

impl<M> MasterData for Arc<M>
where
    M: MasterData + ?Sized,
{
    fn product(&self, id: ProductId) -> DomainResult<Product> {
        (**self).product(id)
    }

    fn pricelist(&self, id: PricelistId) -> DomainResult<Pricelist> {
        (**self).pricelist(id)
    }

    fn party(&self, id: PartyId) -> DomainResult<Party> {
        (**self).party(id)
    }

    fn currency(&self, code: &CurrencyCode) -> DomainResult<Currency> {
        (**self).currency(code)
    }
}
