use crate::errors::{QueryError, Result};
use crate::model::{Entity, EntityKind, Member, Team};
use crate::query::ColumnGroup;
use crate::value::Value;
use serde::Serialize;
use std::any::type_name;
use std::fmt;

/// The shape of one column group, as seen by a row type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Entity(EntityKind),
    Scalar,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Entity(kind) => write!(f, "{}", kind),
            Slot::Scalar => write!(f, "scalar"),
        }
    }
}

fn describe(slots: &[Slot]) -> String {
    let parts: Vec<String> = slots.iter().map(Slot::to_string).collect();
    format!("({})", parts.join(", "))
}

/// Sequential access to the column groups of one result row
pub struct RowReader<'r> {
    layout: &'r [ColumnGroup],
    values: &'r [Value],
    group: usize,
    pos: usize,
}

impl<'r> RowReader<'r> {
    pub fn new(layout: &'r [ColumnGroup], values: &'r [Value]) -> Self {
        Self {
            layout,
            values,
            group: 0,
            pos: 0,
        }
    }

    /// The next group and its values, without consuming them
    pub fn peek(&self) -> Result<(&'r ColumnGroup, &'r [Value])> {
        let group = self.layout.get(self.group).ok_or_else(|| {
            QueryError::projection(
                format!("{} column groups", self.group + 1),
                describe(&self.slots()),
            )
        })?;
        let end = self.pos + group.width();
        let values = self.values.get(self.pos..end).ok_or_else(|| {
            QueryError::projection(
                format!("{} columns", end),
                format!("{} columns", self.values.len()),
            )
        })?;
        Ok((group, values))
    }

    /// Consume the next group
    pub fn next_group(&mut self) -> Result<(&'r ColumnGroup, &'r [Value])> {
        let (group, values) = self.peek()?;
        self.group += 1;
        self.pos += values.len();
        Ok((group, values))
    }

    pub fn skip(&mut self, groups: usize) -> Result<()> {
        for _ in 0..groups {
            self.next_group()?;
        }
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.layout.len().saturating_sub(self.group)
    }

    /// Fail unless every group and value has been consumed
    pub fn finish(&self) -> Result<()> {
        if self.remaining() > 0 || self.pos != self.values.len() {
            return Err(QueryError::projection(
                format!("{} columns", self.pos),
                format!("{} columns", self.values.len()),
            )
            .into());
        }
        Ok(())
    }

    fn slots(&self) -> Vec<Slot> {
        self.layout.iter().map(ColumnGroup::slot).collect()
    }
}

/// A type a result row (or a prefix of one) can be decoded into
pub trait FromRow: Sized {
    /// Column groups this type consumes, in order
    fn shape() -> Vec<Slot>;

    /// Reject a layout this type cannot be decoded from
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousProjection` when the layout's slots differ from
    /// `shape()`.
    fn check_layout(layout: &[ColumnGroup]) -> Result<()> {
        let expected = Self::shape();
        let found: Vec<Slot> = layout.iter().map(ColumnGroup::slot).collect();
        if expected != found {
            return Err(QueryError::projection(
                format!("{} {}", type_name::<Self>(), describe(&expected)),
                describe(&found),
            )
            .into());
        }
        Ok(())
    }

    /// Decode by consuming groups from `row`
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousProjection` when a value has the wrong storage
    /// class or the row is too short.
    fn decode(row: &mut RowReader<'_>) -> Result<Self>;
}

fn mismatch<T>(value: &Value) -> crate::errors::ExError {
    QueryError::projection(type_name::<T>(), value.type_name()).into()
}

impl FromRow for i64 {
    fn shape() -> Vec<Slot> {
        vec![Slot::Scalar]
    }

    fn decode(row: &mut RowReader<'_>) -> Result<Self> {
        let (_, values) = row.next_group()?;
        match &values[0] {
            Value::Integer(i) => Ok(*i),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromRow for i32 {
    fn shape() -> Vec<Slot> {
        vec![Slot::Scalar]
    }

    fn decode(row: &mut RowReader<'_>) -> Result<Self> {
        let (_, values) = row.next_group()?;
        match &values[0] {
            Value::Integer(i) => i32::try_from(*i).map_err(|_| mismatch::<Self>(&values[0])),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromRow for f64 {
    fn shape() -> Vec<Slot> {
        vec![Slot::Scalar]
    }

    fn decode(row: &mut RowReader<'_>) -> Result<Self> {
        let (_, values) = row.next_group()?;
        match &values[0] {
            Value::Real(r) => Ok(*r),
            Value::Integer(i) => Ok(*i as f64),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromRow for String {
    fn shape() -> Vec<Slot> {
        vec![Slot::Scalar]
    }

    fn decode(row: &mut RowReader<'_>) -> Result<Self> {
        let (_, values) = row.next_group()?;
        match &values[0] {
            Value::Text(s) => Ok(s.clone()),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

/// `None` when the first column of the first group is NULL
impl<T: FromRow> FromRow for Option<T> {
    fn shape() -> Vec<Slot> {
        T::shape()
    }

    fn decode(row: &mut RowReader<'_>) -> Result<Self> {
        let (_, values) = row.peek()?;
        if values.first().map_or(true, Value::is_null) {
            row.skip(T::shape().len())?;
            return Ok(None);
        }
        T::decode(row).map(Some)
    }
}

fn decode_entity<E: Entity>(row: &mut RowReader<'_>) -> Result<E> {
    let (group, values) = row.next_group()?;
    let own = E::KIND.columns().len();
    let mut entity = E::from_columns(&values[..own])?;

    let mut offset = own;
    for fetched in &group.fetched {
        let width = fetched.kind.columns().len();
        let cols = &values[offset..offset + width];
        let target = if cols[0].is_null() { None } else { Some(cols) };
        entity.attach_fetched(fetched.association, target)?;
        offset += width;
    }
    Ok(entity)
}

macro_rules! entity_from_row {
    ($ty:ty) => {
        impl FromRow for $ty {
            fn shape() -> Vec<Slot> {
                vec![Slot::Entity(<$ty as Entity>::KIND)]
            }

            fn decode(row: &mut RowReader<'_>) -> Result<Self> {
                decode_entity(row)
            }
        }
    };
}

entity_from_row!(Member);
entity_from_row!(Team);

macro_rules! tuple_from_row {
    ($($name:ident),+) => {
        impl<$($name: FromRow),+> FromRow for ($($name,)+) {
            fn shape() -> Vec<Slot> {
                let mut slots = Vec::new();
                $(slots.extend($name::shape());)+
                slots
            }

            fn decode(row: &mut RowReader<'_>) -> Result<Self> {
                Ok(($($name::decode(row)?,)+))
            }
        }
    };
}

tuple_from_row!(A, B);
tuple_from_row!(A, B, C);
tuple_from_row!(A, B, C, D);

/// One decoded item of a `DynamicRow`
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DynamicItem {
    Member(Member),
    Team(Team),
    Value(Value),
}

/// A row of any shape, decoded item by item; used where the selection is
/// only known at run time
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct DynamicRow(pub Vec<DynamicItem>);

impl FromRow for DynamicRow {
    fn shape() -> Vec<Slot> {
        Vec::new()
    }

    fn check_layout(_layout: &[ColumnGroup]) -> Result<()> {
        Ok(())
    }

    fn decode(row: &mut RowReader<'_>) -> Result<Self> {
        let mut items = Vec::with_capacity(row.remaining());
        while row.remaining() > 0 {
            let (group, values) = row.peek()?;
            let item = match group.slot() {
                Slot::Entity(_) if values[0].is_null() => {
                    row.skip(1)?;
                    DynamicItem::Value(Value::Null)
                }
                Slot::Entity(EntityKind::Member) => DynamicItem::Member(decode_entity(row)?),
                Slot::Entity(EntityKind::Team) => DynamicItem::Team(decode_entity(row)?),
                Slot::Scalar => {
                    row.skip(1)?;
                    DynamicItem::Value(values[0].clone())
                }
            };
            items.push(item);
        }
        Ok(DynamicRow(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::query::{Expr, SelectItem};
    use crate::query::ColumnRef;

    fn entity_group(alias: &str, kind: EntityKind) -> ColumnGroup {
        ColumnGroup {
            item: SelectItem::Entity {
                alias: alias.to_string(),
                kind,
            },
            fetched: Vec::new(),
        }
    }

    fn scalar_group() -> ColumnGroup {
        ColumnGroup {
            item: SelectItem::Expr(Expr::Column(ColumnRef::id("m", EntityKind::Member))),
            fetched: Vec::new(),
        }
    }

    fn team_values(id: i64, name: &str) -> Vec<Value> {
        vec![Value::Integer(id), Value::from(name)]
    }

    #[test]
    fn test_shape_mismatch_is_ambiguous_projection() {
        let layout = vec![entity_group("t", EntityKind::Team)];
        let err = Member::check_layout(&layout).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::AmbiguousProjection);

        let err = <(Member, i64)>::check_layout(&layout).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::AmbiguousProjection);
        assert!(Team::check_layout(&layout).is_ok());
    }

    #[test]
    fn test_decode_tuple() {
        let layout = vec![entity_group("t", EntityKind::Team), scalar_group()];
        let mut values = team_values(1, "teamA");
        values.push(Value::Integer(15));

        let mut reader = RowReader::new(&layout, &values);
        let (team, n) = <(Team, i64)>::decode(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(team.team_name, "teamA");
        assert_eq!(n, 15);
    }

    #[test]
    fn test_optional_entity_decodes_none_on_null_row() {
        let layout = vec![entity_group("t", EntityKind::Team)];
        let values = vec![Value::Null, Value::Null];
        let mut reader = RowReader::new(&layout, &values);
        let team = Option::<Team>::decode(&mut reader).unwrap();
        assert!(team.is_none());
        reader.finish().unwrap();
    }

    #[test]
    fn test_wrong_storage_class() {
        let layout = vec![scalar_group()];
        let values = vec![Value::from("ten")];
        let mut reader = RowReader::new(&layout, &values);
        let err = i64::decode(&mut reader).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::AmbiguousProjection);
    }

    #[test]
    fn test_avg_decodes_integer_or_real() {
        let layout = vec![scalar_group()];
        for value in [Value::Real(25.0), Value::Integer(25)] {
            let values = vec![value];
            let mut reader = RowReader::new(&layout, &values);
            assert_eq!(Option::<f64>::decode(&mut reader).unwrap(), Some(25.0));
        }
    }

    #[test]
    fn test_dynamic_row_accepts_any_layout() {
        let layout = vec![entity_group("t", EntityKind::Team), scalar_group()];
        let mut values = team_values(2, "teamB");
        values.push(Value::Integer(35));
        assert!(DynamicRow::check_layout(&layout).is_ok());

        let mut reader = RowReader::new(&layout, &values);
        let row = DynamicRow::decode(&mut reader).unwrap();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[{"id":2,"team_name":"teamB"},35]"#);
    }
}
