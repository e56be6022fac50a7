//! Parties domain module (customers and suppliers, event-sourced).
//!
//! A customer may carry a default pricelist, which customer invoices pick up
//! when the customer is set on them.

pub mod party;

pub use party::{
    Party, PartyCommand, PartyEvent, PartyId, PartyKind, PartyPricelistChanged, PartyRegistered,
    RegisterParty, SetPartyPricelist,
};
