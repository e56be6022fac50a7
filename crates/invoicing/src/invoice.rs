use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricedesk_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, Event};
use pricedesk_currency::{Currency, CurrencyCode};
use pricedesk_parties::PartyId;
use pricedesk_pricelists::PricelistId;
use pricedesk_products::ProductId;

use crate::resolver::LinePricing;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Kind of accounting document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    OutInvoice,
    OutRefund,
    InInvoice,
    InRefund,
}

impl MoveType {
    /// Customer invoices and refunds; only these are priced from pricelists.
    pub fn is_sale_document(self) -> bool {
        matches!(self, MoveType::OutInvoice | MoveType::OutRefund)
    }
}

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Posted,
    Cancelled,
}

/// A line as entered, before it gets a line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoiceLine {
    /// `None` for free-text lines.
    pub product_id: Option<ProductId>,
    pub name: String,
    pub quantity: Decimal,
    pub price_unit: Decimal,
    /// Percentage.
    pub discount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub line_no: u32,
    pub product_id: Option<ProductId>,
    pub name: String,
    pub quantity: Decimal,
    pub price_unit: Decimal,
    pub discount: Decimal,
}

impl InvoiceLine {
    pub fn pricing(&self) -> LinePricing {
        LinePricing {
            price_unit: self.price_unit,
            discount: self.discount,
        }
    }

    /// `quantity * price_unit * (1 - discount/100)`, rounded to `currency`.
    pub fn price_subtotal(&self, currency: &Currency) -> Decimal {
        currency.round(self.quantity * self.pricing().net_price_unit())
    }
}

/// New price and discount for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePrice {
    pub line_no: u32,
    pub price_unit: Decimal,
    pub discount: Decimal,
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    company_id: Option<CompanyId>,
    partner_id: Option<PartyId>,
    move_type: MoveType,
    currency: Option<CurrencyCode>,
    invoice_date: Option<NaiveDate>,
    pricelist_id: Option<PricelistId>,
    status: InvoiceStatus,
    lines: Vec<InvoiceLine>,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            company_id: None,
            partner_id: None,
            move_type: MoveType::OutInvoice,
            currency: None,
            invoice_date: None,
            pricelist_id: None,
            status: InvoiceStatus::Draft,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn partner_id(&self) -> Option<PartyId> {
        self.partner_id
    }

    pub fn move_type(&self) -> MoveType {
        self.move_type
    }

    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.currency.as_ref()
    }

    /// Date whose exchange rates price this invoice.
    pub fn invoice_date(&self) -> Option<NaiveDate> {
        self.invoice_date
    }

    pub fn pricelist_id(&self) -> Option<PricelistId> {
        self.pricelist_id
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&InvoiceLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_draft(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }

    /// Sum of line subtotals.
    pub fn total_amount(&self, currency: &Currency) -> Decimal {
        self.lines.iter().map(|l| l.price_subtotal(currency)).sum()
    }

    fn next_line_no(&self) -> u32 {
        self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub partner_id: PartyId,
    pub move_type: MoveType,
    pub currency: CurrencyCode,
    pub invoice_date: NaiveDate,
    pub pricelist_id: Option<PricelistId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddInvoiceLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddInvoiceLine {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub line: NewInvoiceLine,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeInvoiceCurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInvoiceCurrency {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub currency: CurrencyCode,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignPricelist (`None` removes the pricelist).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignPricelist {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub pricelist_id: Option<PricelistId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RepriceLines.
///
/// Built by [`crate::service::InvoicePricing`] from the invoice pricelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepriceLines {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub pricelist_id: PricelistId,
    pub prices: Vec<LinePrice>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PostInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    AddInvoiceLine(AddInvoiceLine),
    ChangeInvoiceCurrency(ChangeInvoiceCurrency),
    AssignPricelist(AssignPricelist),
    RepriceLines(RepriceLines),
    PostInvoice(PostInvoice),
    CancelInvoice(CancelInvoice),
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub partner_id: PartyId,
    pub move_type: MoveType,
    pub currency: CurrencyCode,
    pub invoice_date: NaiveDate,
    pub pricelist_id: Option<PricelistId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceLineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineAdded {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub line: InvoiceLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCurrencyChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCurrencyChanged {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub currency: CurrencyCode,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PricelistAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricelistAssigned {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub pricelist_id: Option<PricelistId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceLinesRepriced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLinesRepriced {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub pricelist_id: PricelistId,
    pub prices: Vec<LinePrice>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePosted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePosted {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    InvoiceLineAdded(InvoiceLineAdded),
    InvoiceCurrencyChanged(InvoiceCurrencyChanged),
    PricelistAssigned(PricelistAssigned),
    InvoiceLinesRepriced(InvoiceLinesRepriced),
    InvoicePosted(InvoicePosted),
    InvoiceCancelled(InvoiceCancelled),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::InvoiceLineAdded(_) => "invoicing.invoice.line_added",
            InvoiceEvent::InvoiceCurrencyChanged(_) => "invoicing.invoice.currency_changed",
            InvoiceEvent::PricelistAssigned(_) => "invoicing.invoice.pricelist_assigned",
            InvoiceEvent::InvoiceLinesRepriced(_) => "invoicing.invoice.lines_repriced",
            InvoiceEvent::InvoicePosted(_) => "invoicing.invoice.posted",
            InvoiceEvent::InvoiceCancelled(_) => "invoicing.invoice.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::InvoiceLineAdded(e) => e.occurred_at,
            InvoiceEvent::InvoiceCurrencyChanged(e) => e.occurred_at,
            InvoiceEvent::PricelistAssigned(e) => e.occurred_at,
            InvoiceEvent::InvoiceLinesRepriced(e) => e.occurred_at,
            InvoiceEvent::InvoicePosted(e) => e.occurred_at,
            InvoiceEvent::InvoiceCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.company_id = Some(e.company_id);
                self.partner_id = Some(e.partner_id);
                self.move_type = e.move_type;
                self.currency = Some(e.currency.clone());
                self.invoice_date = Some(e.invoice_date);
                self.pricelist_id = e.pricelist_id;
                self.status = InvoiceStatus::Draft;
                self.lines.clear();
                self.created = true;
            }
            InvoiceEvent::InvoiceLineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            InvoiceEvent::InvoiceCurrencyChanged(e) => {
                self.currency = Some(e.currency.clone());
            }
            InvoiceEvent::PricelistAssigned(e) => {
                self.pricelist_id = e.pricelist_id;
            }
            InvoiceEvent::InvoiceLinesRepriced(e) => {
                for price in &e.prices {
                    if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == price.line_no) {
                        line.price_unit = price.price_unit;
                        line.discount = price.discount;
                    }
                }
            }
            InvoiceEvent::InvoicePosted(_) => {
                self.status = InvoiceStatus::Posted;
            }
            InvoiceEvent::InvoiceCancelled(_) => {
                self.status = InvoiceStatus::Cancelled;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::AddInvoiceLine(cmd) => self.handle_add_line(cmd),
            InvoiceCommand::ChangeInvoiceCurrency(cmd) => self.handle_change_currency(cmd),
            InvoiceCommand::AssignPricelist(cmd) => self.handle_assign_pricelist(cmd),
            InvoiceCommand::RepriceLines(cmd) => self.handle_reprice(cmd),
            InvoiceCommand::PostInvoice(cmd) => self.handle_post(cmd),
            InvoiceCommand::CancelInvoice(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Invoice {
    /// Checks shared by every command on an existing invoice.
    fn ensure_target(
        &self,
        company_id: CompanyId,
        invoice_id: InvoiceId,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("invoice {invoice_id}")));
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    fn ensure_draft(&self) -> Result<(), DomainError> {
        if self.status != InvoiceStatus::Draft {
            return Err(DomainError::conflict(format!(
                "invoice {} is {:?}; only draft invoices can be changed",
                self.id, self.status
            )));
        }
        Ok(())
    }

    fn ensure_pricelist_allowed(
        move_type: MoveType,
        pricelist_id: Option<PricelistId>,
    ) -> Result<(), DomainError> {
        if pricelist_id.is_some() && !move_type.is_sale_document() {
            return Err(DomainError::validation(format!(
                "pricelists only apply to customer documents, not {move_type:?}"
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        Self::ensure_pricelist_allowed(cmd.move_type, cmd.pricelist_id)?;

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            partner_id: cmd.partner_id,
            move_type: cmd.move_type,
            currency: cmd.currency.clone(),
            invoice_date: cmd.invoice_date,
            pricelist_id: cmd.pricelist_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddInvoiceLine) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft()?;

        let line = &cmd.line;
        if line.name.trim().is_empty() {
            return Err(DomainError::validation("line description cannot be empty"));
        }
        if line.quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity must be positive, got {}",
                line.quantity
            )));
        }
        if line.discount > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(format!(
                "discount cannot exceed 100%, got {}",
                line.discount
            )));
        }

        Ok(vec![InvoiceEvent::InvoiceLineAdded(InvoiceLineAdded {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            line: InvoiceLine {
                line_no: self.next_line_no(),
                product_id: line.product_id,
                name: line.name.clone(),
                quantity: line.quantity,
                price_unit: line.price_unit,
                discount: line.discount,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_currency(
        &self,
        cmd: &ChangeInvoiceCurrency,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft()?;

        if self.currency.as_ref() == Some(&cmd.currency) {
            return Ok(vec![]);
        }

        Ok(vec![InvoiceEvent::InvoiceCurrencyChanged(InvoiceCurrencyChanged {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            currency: cmd.currency.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_pricelist(
        &self,
        cmd: &AssignPricelist,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft()?;
        Self::ensure_pricelist_allowed(self.move_type, cmd.pricelist_id)?;

        if self.pricelist_id == cmd.pricelist_id {
            return Ok(vec![]);
        }

        Ok(vec![InvoiceEvent::PricelistAssigned(PricelistAssigned {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            pricelist_id: cmd.pricelist_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reprice(&self, cmd: &RepriceLines) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft()?;

        if self.pricelist_id != Some(cmd.pricelist_id) {
            return Err(DomainError::conflict(format!(
                "prices were computed with pricelist {}, invoice uses {:?}",
                cmd.pricelist_id, self.pricelist_id
            )));
        }

        let mut seen = BTreeSet::new();
        for price in &cmd.prices {
            if self.line(price.line_no).is_none() {
                return Err(DomainError::validation(format!(
                    "invoice {} has no line {}",
                    self.id, price.line_no
                )));
            }
            if !seen.insert(price.line_no) {
                return Err(DomainError::validation(format!(
                    "line {} priced more than once",
                    price.line_no
                )));
            }
        }

        if cmd.prices.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![InvoiceEvent::InvoiceLinesRepriced(InvoiceLinesRepriced {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            pricelist_id: cmd.pricelist_id,
            prices: cmd.prices.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_post(&self, cmd: &PostInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft()?;

        if self.lines.is_empty() {
            return Err(DomainError::invariant("cannot post an invoice without lines"));
        }

        Ok(vec![InvoiceEvent::InvoicePosted(InvoicePosted {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_target(cmd.company_id, cmd.invoice_id)?;

        if self.status == InvoiceStatus::Cancelled {
            return Err(DomainError::conflict("invoice is already cancelled"));
        }

        Ok(vec![InvoiceEvent::InvoiceCancelled(InvoiceCancelled {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricedesk_currency::Precision;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD").unwrap()
    }

    fn test_invoice_id() -> InvoiceId {
        InvoiceId::new(AggregateId::new())
    }

    fn test_partner_id() -> PartyId {
        PartyId::new(AggregateId::new())
    }

    fn test_pricelist_id() -> PricelistId {
        PricelistId::new(AggregateId::new())
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn draft(company_id: CompanyId, move_type: MoveType) -> Invoice {
        let invoice_id = test_invoice_id();
        let mut invoice = Invoice::empty(invoice_id);
        invoice
            .execute(&InvoiceCommand::CreateInvoice(CreateInvoice {
                company_id,
                invoice_id,
                partner_id: test_partner_id(),
                move_type,
                currency: usd(),
                invoice_date: test_date(),
                pricelist_id: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        invoice
    }

    fn add_line(
        invoice: &mut Invoice,
        company_id: CompanyId,
        price_unit: Decimal,
        discount: Decimal,
    ) {
        invoice
            .execute(&InvoiceCommand::AddInvoiceLine(AddInvoiceLine {
                company_id,
                invoice_id: invoice.id_typed(),
                line: NewInvoiceLine {
                    product_id: Some(ProductId::new(AggregateId::new())),
                    name: "Test line".to_string(),
                    quantity: dec!(1),
                    price_unit,
                    discount,
                },
                occurred_at: Utc::now(),
            }))
            .unwrap();
    }

    fn assign(
        invoice: &mut Invoice,
        company_id: CompanyId,
        pricelist_id: Option<PricelistId>,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        invoice.execute(&InvoiceCommand::AssignPricelist(AssignPricelist {
            company_id,
            invoice_id: invoice.id_typed(),
            pricelist_id,
            occurred_at: Utc::now(),
        }))
    }

    fn reprice(
        pricelist_id: PricelistId,
        invoice: &Invoice,
        company_id: CompanyId,
        prices: Vec<LinePrice>,
    ) -> InvoiceCommand {
        InvoiceCommand::RepriceLines(RepriceLines {
            company_id,
            invoice_id: invoice.id_typed(),
            pricelist_id,
            prices,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn lines_are_numbered_sequentially() {
        let company_id = CompanyId::new();
        let mut invoice = draft(company_id, MoveType::OutInvoice);
        add_line(&mut invoice, company_id, dec!(100), dec!(0));
        add_line(&mut invoice, company_id, dec!(100), dec!(0));

        let numbers: Vec<u32> = invoice.lines().iter().map(|l| l.line_no).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let company_id = CompanyId::new();
        let mut invoice = draft(company_id, MoveType::OutInvoice);

        for quantity in [Decimal::ZERO, dec!(-2)] {
            let err = invoice
                .execute(&InvoiceCommand::AddInvoiceLine(AddInvoiceLine {
                    company_id,
                    invoice_id: invoice.id_typed(),
                    line: NewInvoiceLine {
                        product_id: Some(ProductId::new(AggregateId::new())),
                        name: "Test line".to_string(),
                        quantity,
                        price_unit: dec!(100),
                        discount: Decimal::ZERO,
                    },
                    occurred_at: Utc::now(),
                }))
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
        assert!(invoice.lines().is_empty());
    }

    #[test]
    fn subtotal_applies_discount_and_rounds() {
        let currency = Currency::new(usd(), "US Dollar", Precision::CENTS);
        let line = InvoiceLine {
            line_no: 1,
            product_id: None,
            name: "x".to_string(),
            quantity: dec!(3),
            price_unit: dec!(65.41),
            discount: dec!(8.27),
        };
        // 3 * 65.41 * 0.9173 = 180.0018
        assert_eq!(line.price_subtotal(&currency), dec!(180.00));
    }

    #[test]
    fn vendor_bill_cannot_carry_a_pricelist() {
        let company_id = CompanyId::new();
        let mut invoice = draft(company_id, MoveType::InInvoice);
        let err = assign(&mut invoice, company_id, Some(test_pricelist_id())).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(invoice.pricelist_id(), None);
    }

    #[test]
    fn reassigning_the_same_pricelist_is_a_no_op() {
        let company_id = CompanyId::new();
        let mut invoice = draft(company_id, MoveType::OutRefund);
        let pricelist_id = test_pricelist_id();

        assert_eq!(assign(&mut invoice, company_id, Some(pricelist_id)).unwrap().len(), 1);
        assert!(assign(&mut invoice, company_id, Some(pricelist_id)).unwrap().is_empty());
        assert_eq!(invoice.pricelist_id(), Some(pricelist_id));
    }

    #[test]
    fn reprice_updates_only_listed_lines() {
        let company_id = CompanyId::new();
        let mut invoice = draft(company_id, MoveType::OutInvoice);
        add_line(&mut invoice, company_id, dec!(100), dec!(0));
        add_line(&mut invoice, company_id, dec!(100), dec!(0));
        let pricelist_id = test_pricelist_id();
        assign(&mut invoice, company_id, Some(pricelist_id)).unwrap();

        let cmd = reprice(pricelist_id, &invoice, company_id, vec![LinePrice {
            line_no: 1,
            price_unit: dec!(100),
            discount: dec!(40),
        }]);
        invoice.execute(&cmd).unwrap();

        assert_eq!(invoice.line(1).unwrap().discount, dec!(40));
        assert_eq!(invoice.line(2).unwrap().discount, dec!(0));
    }

    #[test]
    fn reprice_with_stale_pricelist_is_rejected() {
        let company_id = CompanyId::new();
        let mut invoice = draft(company_id, MoveType::OutInvoice);
        add_line(&mut invoice, company_id, dec!(100), dec!(0));
        assign(&mut invoice, company_id, Some(test_pricelist_id())).unwrap();

        let cmd = reprice(test_pricelist_id(), &invoice, company_id, vec![LinePrice {
            line_no: 1,
            price_unit: dec!(60),
            discount: dec!(0),
        }]);
        assert!(matches!(invoice.handle(&cmd), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn reprice_of_unknown_or_duplicate_line_is_atomic() {
        let company_id = CompanyId::new();
        let mut invoice = draft(company_id, MoveType::OutInvoice);
        add_line(&mut invoice, company_id, dec!(100), dec!(0));
        let pricelist_id = test_pricelist_id();
        assign(&mut invoice, company_id, Some(pricelist_id)).unwrap();
        let before = invoice.clone();

        let unknown = reprice(pricelist_id, &invoice, company_id, vec![
            LinePrice { line_no: 1, price_unit: dec!(60), discount: dec!(0) },
            LinePrice { line_no: 9, price_unit: dec!(60), discount: dec!(0) },
        ]);
        assert!(matches!(invoice.execute(&unknown), Err(DomainError::Validation(_))));

        let duplicate = reprice(pricelist_id, &invoice, company_id, vec![
            LinePrice { line_no: 1, price_unit: dec!(60), discount: dec!(0) },
            LinePrice { line_no: 1, price_unit: dec!(50), discount: dec!(0) },
        ]);
        assert!(matches!(invoice.execute(&duplicate), Err(DomainError::Validation(_))));

        assert_eq!(invoice, before);
    }

    #[test]
    fn posted_invoice_cannot_be_repriced() {
        let company_id = CompanyId::new();
        let mut invoice = draft(company_id, MoveType::OutInvoice);
        add_line(&mut invoice, company_id, dec!(100), dec!(0));
        let pricelist_id = test_pricelist_id();
        assign(&mut invoice, company_id, Some(pricelist_id)).unwrap();
        invoice
            .execute(&InvoiceCommand::PostInvoice(PostInvoice {
                company_id,
                invoice_id: invoice.id_typed(),
                occurred_at: Utc::now(),
            }))
            .unwrap();

        let cmd = reprice(pricelist_id, &invoice, company_id, vec![LinePrice {
            line_no: 1,
            price_unit: dec!(60),
            discount: dec!(0),
        }]);
        assert!(matches!(invoice.handle(&cmd), Err(DomainError::Conflict(_))));
        assert_eq!(invoice.status(), InvoiceStatus::Posted);
    }

    #[test]
    fn empty_invoice_cannot_be_posted() {
        let company_id = CompanyId::new();
        let invoice = draft(company_id, MoveType::OutInvoice);
        let err = invoice
            .handle(&InvoiceCommand::PostInvoice(PostInvoice {
                company_id,
                invoice_id: invoice.id_typed(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn cancel_twice_is_a_conflict() {
        let company_id = CompanyId::new();
        let mut invoice = draft(company_id, MoveType::OutInvoice);
        let cancel = InvoiceCommand::CancelInvoice(CancelInvoice {
            company_id,
            invoice_id: invoice.id_typed(),
            reason: Some("duplicate".to_string()),
            occurred_at: Utc::now(),
        });
        invoice.execute(&cancel).unwrap();
        assert!(matches!(invoice.handle(&cancel), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn commands_on_missing_invoice_are_not_found() {
        let invoice = Invoice::empty(test_invoice_id());
        let err = invoice
            .handle(&InvoiceCommand::ChangeInvoiceCurrency(ChangeInvoiceCurrency {
                company_id: CompanyId::new(),
                invoice_id: invoice.id_typed(),
                currency: usd(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn event_types_are_stable() {
        let company_id = CompanyId::new();
        let invoice_id = test_invoice_id();
        let event = InvoiceEvent::InvoiceLinesRepriced(InvoiceLinesRepriced {
            company_id,
            invoice_id,
            pricelist_id: test_pricelist_id(),
            prices: vec![],
            occurred_at: Utc::now(),
        });
        assert_eq!(event.event_type(), "invoicing.invoice.lines_repriced");
        assert_eq!(event.version(), 1);
    }
}
