//! Products domain module (event-sourced).
//!
//! A product carries the list price that pricelists discount from.

pub mod product;

pub use product::{
    ChangeListPrice, CreateProduct, ListPriceChanged, Product, ProductCommand, ProductCreated,
    ProductEvent, ProductId,
};
