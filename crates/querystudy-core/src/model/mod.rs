//! Entity model: Member and Team with a many-to-one association
//!
//! Entities are plain value holders. Identity is assigned by the store on
//! first persistence and compared by id afterwards.

pub mod association;
pub mod id;
pub mod member;
pub mod meta;
pub mod team;

pub use association::Association;
pub use id::{Id, MemberId, TeamId};
pub use member::Member;
pub use meta::{AssociationMeta, EntityKind, FieldMeta, ValueKind};
pub use team::Team;

use crate::errors::{QueryError, Result};
use crate::value::Value;

/// Behavior the session and the mapping layer need from a persistent type
pub trait Entity: Sized {
    /// Metadata describing the table this entity is stored in
    const KIND: EntityKind;

    /// Store-assigned identity, `None` while transient
    fn id(&self) -> Option<Id<Self>>;

    /// Record the identity assigned by the session on persist
    fn assign_id(&mut self, id: Id<Self>);

    /// Reject references to entities that have no identity yet
    fn check_references(&self) -> Result<()> {
        Ok(())
    }

    /// Identities this entity points at through its associations
    fn references(&self) -> Vec<(EntityKind, i64)> {
        Vec::new()
    }

    /// Column values in `KIND.columns()` order, identity first
    fn column_values(&self) -> Vec<Value>;

    /// Materialize from column values in `KIND.columns()` order
    fn from_columns(values: &[Value]) -> Result<Self>;

    /// Install the target of an eagerly fetched association; `values` is
    /// `None` when the join matched no row
    fn attach_fetched(&mut self, association: &str, values: Option<&[Value]>) -> Result<()> {
        let _ = values;
        Err(QueryError::projection(
            Self::KIND.name(),
            format!("unknown association {}", association),
        )
        .into())
    }
}

/// Column readers shared by the `from_columns` implementations
pub(crate) mod columns {
    use super::EntityKind;
    use crate::errors::{QueryError, Result};
    use crate::value::Value;

    fn column<'a>(values: &'a [Value], idx: usize, kind: EntityKind) -> Result<&'a Value> {
        values.get(idx).ok_or_else(|| {
            QueryError::projection(
                kind.name(),
                format!("{} columns, expected {}", values.len(), kind.columns().len()),
            )
            .into()
        })
    }

    fn mismatch(kind: EntityKind, idx: usize, found: &Value) -> crate::errors::ExError {
        QueryError::projection(
            format!("{}.{}", kind.name(), kind.columns()[idx]),
            found.type_name(),
        )
        .into()
    }

    pub(crate) fn integer(values: &[Value], idx: usize, kind: EntityKind) -> Result<i64> {
        match column(values, idx, kind)? {
            Value::Integer(i) => Ok(*i),
            other => Err(mismatch(kind, idx, other)),
        }
    }

    pub(crate) fn opt_integer(
        values: &[Value],
        idx: usize,
        kind: EntityKind,
    ) -> Result<Option<i64>> {
        match column(values, idx, kind)? {
            Value::Null => Ok(None),
            Value::Integer(i) => Ok(Some(*i)),
            other => Err(mismatch(kind, idx, other)),
        }
    }

    pub(crate) fn text(values: &[Value], idx: usize, kind: EntityKind) -> Result<String> {
        match column(values, idx, kind)? {
            Value::Text(s) => Ok(s.clone()),
            other => Err(mismatch(kind, idx, other)),
        }
    }

    pub(crate) fn opt_text(
        values: &[Value],
        idx: usize,
        kind: EntityKind,
    ) -> Result<Option<String>> {
        match column(values, idx, kind)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            other => Err(mismatch(kind, idx, other)),
        }
    }
}
