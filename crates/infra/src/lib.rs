//! Infrastructure layer: configuration and master data storage.

pub mod config;
pub mod master_data;

pub use config::{ConfigError, PricingConfig};
pub use master_data::InMemoryMasterData;
