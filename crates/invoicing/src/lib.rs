//! Invoicing domain module.
//!
//! Prices invoice lines from a pricelist the same way sales orders do:
//! - [`resolver::PriceResolver`] turns a pricelist price into a displayed
//!   unit price and discount in the invoice currency;
//! - [`service::InvoicePricing`] applies it to whole invoices (partner default
//!   pricelist, new lines, explicit "update prices" refresh);
//! - [`invoice::Invoice`] is the event-sourced document that records the result.

pub mod catalog;
pub mod invoice;
pub mod resolver;
pub mod service;

pub use catalog::MasterData;
pub use invoice::{
    AddInvoiceLine, AssignPricelist, CancelInvoice, ChangeInvoiceCurrency, CreateInvoice, Invoice,
    InvoiceCancelled, InvoiceCommand, InvoiceCreated, InvoiceCurrencyChanged, InvoiceEvent,
    InvoiceId, InvoiceLine, InvoiceLineAdded, InvoiceLinesRepriced, InvoicePosted, InvoiceStatus,
    LinePrice, MoveType, NewInvoiceLine, PostInvoice, PricelistAssigned, RepriceLines,
};
pub use resolver::{LinePricing, PriceResolver};
pub use service::InvoicePricing;
