//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. In this
/// workspace that covers things like rounding precisions, pricelist rules and
/// computed line prices: two `LinePricing { price_unit: 100, discount: 40 }`
/// are interchangeable wherever they appear.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
