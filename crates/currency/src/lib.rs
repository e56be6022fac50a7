//! Currencies, rounding precision and dated exchange rates.
//!
//! Conversion is always scoped by an explicit company and date; nothing in
//! this crate reads an ambient "current company" or "today".

pub mod converter;
pub mod currency;
pub mod rate;

pub use converter::CurrencyConverter;
pub use currency::{Currency, CurrencyCode, Precision};
pub use rate::{CurrencyRate, RateTable};
