//! Invoice-level pricing: partner default pricelist, new product lines and
//! the explicit "update prices from pricelist" refresh.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use pricedesk_core::{Aggregate, CompanyId, DomainError, DomainResult};
use pricedesk_currency::{Currency, CurrencyConverter};
use pricedesk_parties::PartyId;
use pricedesk_pricelists::{PricelistEngine, PricelistId};
use pricedesk_products::{Product, ProductId};

use crate::catalog::MasterData;
use crate::invoice::{
    AddInvoiceLine, AssignPricelist, Invoice, InvoiceCommand, InvoiceEvent, LinePrice, MoveType,
    NewInvoiceLine, RepriceLines,
};
use crate::resolver::{LinePricing, PriceResolver};

/// Company, currency and date an invoice is priced in.
struct PricingContext {
    company: CompanyId,
    currency: Currency,
    date: NaiveDate,
}

pub struct InvoicePricing<M, E, C> {
    master_data: M,
    resolver: PriceResolver<E, C>,
}

impl<M, E, C> InvoicePricing<M, E, C>
where
    M: MasterData,
    E: PricelistEngine,
    C: CurrencyConverter,
{
    pub fn new(master_data: M, resolver: PriceResolver<E, C>) -> Self {
        Self {
            master_data,
            resolver,
        }
    }

    /// Pricelist a document of `move_type` gets when `partner_id` is set on it.
    ///
    /// Purchase documents never get one.
    pub fn default_pricelist_for_partner(
        &self,
        move_type: MoveType,
        partner_id: PartyId,
    ) -> DomainResult<Option<PricelistId>> {
        if !move_type.is_sale_document() {
            return Ok(None);
        }
        let party = self.master_data.party(partner_id)?;
        Ok(party.pricelist_id())
    }

    /// Copy the partner's default pricelist onto a draft customer invoice.
    ///
    /// An invoice whose partner has no default keeps its current pricelist.
    pub fn apply_partner_pricelist(
        &self,
        invoice: &mut Invoice,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<InvoiceEvent>> {
        let ctx = self.context(invoice)?;
        let partner_id = invoice
            .partner_id()
            .ok_or_else(|| DomainError::invariant("invoice has no partner"))?;

        let default = self.default_pricelist_for_partner(invoice.move_type(), partner_id)?;
        let Some(pricelist_id) = default else {
            return Ok(vec![]);
        };

        invoice.execute(&InvoiceCommand::AssignPricelist(AssignPricelist {
            company_id: ctx.company,
            invoice_id: invoice.id_typed(),
            pricelist_id: Some(pricelist_id),
            occurred_at,
        }))
    }

    /// Price `quantity` of `product_id` as a line of `invoice`.
    ///
    /// Customer documents with a pricelist use it; anything else gets the
    /// list price in the invoice currency with no discount.
    pub fn price_line(
        &self,
        invoice: &Invoice,
        product_id: ProductId,
        quantity: Decimal,
    ) -> DomainResult<LinePricing> {
        let ctx = self.context(invoice)?;
        let product = self.master_data.product(product_id)?;
        self.price_product(invoice, &product, quantity, &ctx)
    }

    /// Add a product line priced from the invoice pricelist.
    pub fn add_product_line(
        &self,
        invoice: &mut Invoice,
        product_id: ProductId,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<InvoiceEvent>> {
        let ctx = self.context(invoice)?;
        let product = self.master_data.product(product_id)?;
        let pricing = self.price_product(invoice, &product, quantity, &ctx)?;

        invoice.execute(&InvoiceCommand::AddInvoiceLine(AddInvoiceLine {
            company_id: ctx.company,
            invoice_id: invoice.id_typed(),
            line: NewInvoiceLine {
                product_id: Some(product_id),
                name: product.name().to_string(),
                quantity,
                price_unit: pricing.price_unit,
                discount: pricing.discount,
            },
            occurred_at,
        }))
    }

    /// Build the command that reprices every product line of `invoice` with
    /// its pricelist, currency, company and date.
    ///
    /// Free-text lines are left out. Fails without a partial result if any
    /// line cannot be priced.
    pub fn reprice_command(
        &self,
        invoice: &Invoice,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<InvoiceCommand> {
        if !invoice.is_draft() {
            return Err(DomainError::conflict(format!(
                "invoice {} is not a draft",
                invoice.id_typed()
            )));
        }
        let ctx = self.context(invoice)?;
        let pricelist_id = invoice.pricelist_id().ok_or_else(|| {
            DomainError::validation(format!("invoice {} has no pricelist", invoice.id_typed()))
        })?;
        let pricelist = self.master_data.pricelist(pricelist_id)?;

        let mut prices = Vec::with_capacity(invoice.lines().len());
        for line in invoice.lines() {
            let Some(product_id) = line.product_id else {
                continue;
            };
            let product = self.master_data.product(product_id)?;
            let pricing = self.resolver.resolve(
                &product,
                line.quantity,
                &pricelist,
                &ctx.currency,
                ctx.company,
                ctx.date,
            )?;
            prices.push(LinePrice {
                line_no: line.line_no,
                price_unit: pricing.price_unit,
                discount: pricing.discount,
            });
        }

        Ok(InvoiceCommand::RepriceLines(RepriceLines {
            company_id: ctx.company,
            invoice_id: invoice.id_typed(),
            pricelist_id,
            prices,
            occurred_at,
        }))
    }

    /// Reprice `invoice` from its pricelist and apply the result.
    pub fn update_prices_from_pricelist(
        &self,
        invoice: &mut Invoice,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<InvoiceEvent>> {
        let command = self.reprice_command(invoice, occurred_at)?;
        let events = invoice.execute(&command)?;

        tracing::info!(
            invoice = %invoice.id_typed(),
            lines = invoice.lines().len(),
            "invoice prices updated from pricelist"
        );
        Ok(events)
    }

    fn price_product(
        &self,
        invoice: &Invoice,
        product: &Product,
        quantity: Decimal,
        ctx: &PricingContext,
    ) -> DomainResult<LinePricing> {
        match invoice.pricelist_id() {
            Some(pricelist_id) if invoice.move_type().is_sale_document() => {
                let pricelist = self.master_data.pricelist(pricelist_id)?;
                self.resolver
                    .resolve(product, quantity, &pricelist, &ctx.currency, ctx.company, ctx.date)
            }
            _ => self
                .resolver
                .resolve_without_pricelist(product, &ctx.currency, ctx.company, ctx.date),
        }
    }

    fn context(&self, invoice: &Invoice) -> DomainResult<PricingContext> {
        let missing = || DomainError::not_found(format!("invoice {}", invoice.id_typed()));
        let company = invoice.company_id().ok_or_else(missing)?;
        let code = invoice.currency().ok_or_else(missing)?;
        let date = invoice.invoice_date().ok_or_else(missing)?;
        let currency = self.master_data.currency(code)?;

        Ok(PricingContext {
            company,
            currency,
            date,
        })
    }
}
