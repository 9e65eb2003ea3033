//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; two
/// with the same values are the same thing. `Money` and journal lines are
/// value objects; a ledger account or bill (which has an id) is an entity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
