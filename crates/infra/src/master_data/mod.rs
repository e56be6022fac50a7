//! Master data storage behind the [`pricedesk_invoicing::MasterData`] boundary.

pub mod in_memory;

pub use in_memory::InMemoryMasterData;
