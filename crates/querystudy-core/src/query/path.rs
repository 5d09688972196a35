//! Typed column paths, operands and aggregates
//!
//! `Path<T>` carries the Rust type of its column so that comparisons only
//! accept operands of the same kind (text against text, integer against
//! integer). Comparing two paths is how theta-join predicates are written.

use super::expr::{
    escape_like, AggregateFn, ColumnRef, CompareOp, Direction, Expr, OrderSpec, Predicate,
};
use crate::model::ValueKind;
use crate::value::Value;
use std::marker::PhantomData;

/// Marker for text columns
#[derive(Debug)]
pub enum Text {}

/// Marker for integer columns
#[derive(Debug)]
pub enum Integer {}

/// Rust types that a column path can be typed with
pub trait ColumnType {
    /// Comparison kind: `Text` or `Integer`
    type Kind;
    /// The non-null value type, used for min/max outputs
    type Base;
    const VALUE_KIND: ValueKind;
}

impl ColumnType for String {
    type Kind = Text;
    type Base = String;
    const VALUE_KIND: ValueKind = ValueKind::Text;
}

impl ColumnType for Option<String> {
    type Kind = Text;
    type Base = String;
    const VALUE_KIND: ValueKind = ValueKind::Text;
}

impl ColumnType for i32 {
    type Kind = Integer;
    type Base = i32;
    const VALUE_KIND: ValueKind = ValueKind::Integer;
}

impl ColumnType for i64 {
    type Kind = Integer;
    type Base = i64;
    const VALUE_KIND: ValueKind = ValueKind::Integer;
}

/// Something usable on the right-hand side of a comparison against a
/// column of kind `K`
pub trait Operand<K> {
    fn into_expr(self) -> Expr;
}

impl Operand<Text> for &str {
    fn into_expr(self) -> Expr {
        Expr::Literal(Value::from(self))
    }
}

impl Operand<Text> for String {
    fn into_expr(self) -> Expr {
        Expr::Literal(Value::Text(self))
    }
}

impl Operand<Text> for &String {
    fn into_expr(self) -> Expr {
        Expr::Literal(Value::Text(self.clone()))
    }
}

impl Operand<Integer> for i32 {
    fn into_expr(self) -> Expr {
        Expr::Literal(Value::from(self))
    }
}

impl Operand<Integer> for i64 {
    fn into_expr(self) -> Expr {
        Expr::Literal(Value::Integer(self))
    }
}

impl<T: ColumnType> Operand<T::Kind> for &Path<T> {
    fn into_expr(self) -> Expr {
        self.expr()
    }
}

impl<T: ColumnType> Operand<T::Kind> for Path<T> {
    fn into_expr(self) -> Expr {
        Expr::Column(self.column)
    }
}

/// A typed reference to one column of an aliased entity
#[derive(Debug)]
pub struct Path<T> {
    column: ColumnRef,
    _type: PhantomData<fn() -> T>,
}

impl<T> Clone for Path<T> {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            _type: PhantomData,
        }
    }
}

impl<T: ColumnType> Path<T> {
    pub(crate) fn new(column: ColumnRef) -> Self {
        debug_assert_eq!(column.kind, T::VALUE_KIND);
        Self {
            column,
            _type: PhantomData,
        }
    }

    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    pub fn expr(&self) -> Expr {
        Expr::Column(self.column.clone())
    }

    fn compare(&self, op: CompareOp, rhs: impl Operand<T::Kind>) -> Predicate {
        Predicate::compare(op, self.expr(), rhs.into_expr())
    }

    pub fn eq(&self, rhs: impl Operand<T::Kind>) -> Predicate {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn ne(&self, rhs: impl Operand<T::Kind>) -> Predicate {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::IsNull {
            expr: self.expr(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::IsNull {
            expr: self.expr(),
            negated: true,
        }
    }

    pub fn in_list<O: Operand<T::Kind>>(&self, values: impl IntoIterator<Item = O>) -> Predicate {
        Predicate::InList {
            expr: self.expr(),
            list: values.into_iter().map(Operand::into_expr).collect(),
            negated: false,
        }
    }

    pub fn asc(&self) -> OrderSpec {
        OrderSpec {
            expr: self.expr(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(&self) -> OrderSpec {
        OrderSpec {
            expr: self.expr(),
            direction: Direction::Desc,
        }
    }

    /// Number of non-null values
    pub fn count(&self) -> Aggregate<i64> {
        Aggregate::new(AggregateFn::Count, self.column.clone())
    }

    pub fn min(&self) -> Aggregate<Option<T::Base>> {
        Aggregate::new(AggregateFn::Min, self.column.clone())
    }

    pub fn max(&self) -> Aggregate<Option<T::Base>> {
        Aggregate::new(AggregateFn::Max, self.column.clone())
    }
}

impl<T: ColumnType<Kind = Integer>> Path<T> {
    pub fn gt(&self, rhs: impl Operand<Integer>) -> Predicate {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn goe(&self, rhs: impl Operand<Integer>) -> Predicate {
        self.compare(CompareOp::Ge, rhs)
    }

    pub fn lt(&self, rhs: impl Operand<Integer>) -> Predicate {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn loe(&self, rhs: impl Operand<Integer>) -> Predicate {
        self.compare(CompareOp::Le, rhs)
    }

    /// Inclusive range
    pub fn between(&self, low: impl Operand<Integer>, high: impl Operand<Integer>) -> Predicate {
        Predicate::Between {
            expr: self.expr(),
            low: low.into_expr(),
            high: high.into_expr(),
            negated: false,
        }
    }

    /// Sum of values, 0 when no rows contribute
    pub fn sum(&self) -> Aggregate<i64> {
        Aggregate::new(AggregateFn::Sum, self.column.clone())
    }

    /// Floating-point arithmetic mean, `None` when no rows contribute
    pub fn avg(&self) -> Aggregate<Option<f64>> {
        Aggregate::new(AggregateFn::Avg, self.column.clone())
    }
}

impl<T: ColumnType<Kind = Text>> Path<T> {
    /// Raw LIKE pattern: `%` and `_` are wildcards, `\` escapes
    pub fn like(&self, pattern: impl Into<String>) -> Predicate {
        Predicate::Like {
            expr: self.expr(),
            pattern: Expr::Literal(Value::Text(pattern.into())),
            negated: false,
        }
    }

    pub fn starts_with(&self, prefix: &str) -> Predicate {
        self.like(format!("{}%", escape_like(prefix)))
    }

    pub fn contains(&self, infix: &str) -> Predicate {
        self.like(format!("%{}%", escape_like(infix)))
    }
}

/// A typed aggregate expression; `O` is the decoded result type
#[derive(Debug)]
pub struct Aggregate<O> {
    expr: Expr,
    _output: PhantomData<fn() -> O>,
}

impl<O> Clone for Aggregate<O> {
    fn clone(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            _output: PhantomData,
        }
    }
}

impl<O> Aggregate<O> {
    pub(crate) fn new(func: AggregateFn, arg: ColumnRef) -> Self {
        Self {
            expr: Expr::Aggregate { func, arg },
            _output: PhantomData,
        }
    }

    pub fn expr(&self) -> Expr {
        self.expr.clone()
    }

    fn compare(&self, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::compare(op, self.expr(), Expr::Literal(value.into()))
    }

    // Comparisons for `having`

    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn goe(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn loe(&self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn asc(&self) -> OrderSpec {
        OrderSpec {
            expr: self.expr(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(&self) -> OrderSpec {
        OrderSpec {
            expr: self.expr(),
            direction: Direction::Desc,
        }
    }
}
