//! Many-to-one association with lazy or eager materialization

use super::{Entity, Id};
use serde::Serialize;

/// Reference from an owning entity to at most one target entity
///
/// A fetch join yields `Loaded`; a plain query yields `Lazy` until the
/// session loads the target on first access.
#[derive(Debug, Clone, Serialize)]
pub enum Association<T> {
    /// No target (null foreign key)
    Absent,
    /// Target identity known, object not materialized
    Lazy(Id<T>),
    /// Target materialized
    Loaded(T),
}

impl<T> Default for Association<T> {
    fn default() -> Self {
        Association::Absent
    }
}

impl<T: Entity> Association<T> {
    /// Point at `target`; the object is kept as already loaded
    pub fn to(target: &T) -> Self
    where
        T: Clone,
    {
        Association::Loaded(target.clone())
    }

    /// Whether reading the target needs no further store access
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Association::Lazy(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Association::Absent)
    }

    /// Identity of the target, if any and if already assigned
    pub fn id(&self) -> Option<Id<T>> {
        match self {
            Association::Absent => None,
            Association::Lazy(id) => Some(*id),
            Association::Loaded(target) => target.id(),
        }
    }

    /// The target, if materialized
    pub fn get(&self) -> Option<&T> {
        match self {
            Association::Loaded(target) => Some(target),
            _ => None,
        }
    }
}
