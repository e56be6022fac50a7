//! Entity trait: identity + continuity across state changes.

/// Master data record identified by a stable id (pricelists, currencies).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
