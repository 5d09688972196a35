//! Untyped expression and predicate tree
//!
//! Typed paths and the textual parser both lower into these nodes; the
//! store compiles them to SQL.

use crate::model::{EntityKind, FieldMeta, ValueKind};
use crate::value::Value;
use std::ops::Not;

/// A column of an aliased entity source
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub alias: String,
    pub entity: EntityKind,
    pub column: &'static str,
    pub kind: ValueKind,
}

impl ColumnRef {
    pub fn field(alias: impl Into<String>, entity: EntityKind, field: &FieldMeta) -> Self {
        Self {
            alias: alias.into(),
            entity,
            column: field.column,
            kind: field.kind,
        }
    }

    /// Identity column of the aliased entity
    pub fn id(alias: impl Into<String>, entity: EntityKind) -> Self {
        Self {
            alias: alias.into(),
            entity,
            column: entity.id_column(),
            kind: ValueKind::Integer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFn::Count),
            "sum" => Some(AggregateFn::Sum),
            "avg" => Some(AggregateFn::Avg),
            "min" => Some(AggregateFn::Min),
            "max" => Some(AggregateFn::Max),
            _ => None,
        }
    }
}

/// A scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Value),
    /// Named parameter bound at execution time
    Param(String),
    Aggregate { func: AggregateFn, arg: ColumnRef },
}

impl Expr {
    /// Visit every column reference, including aggregate arguments
    pub fn for_each_column(&self, f: &mut impl FnMut(&ColumnRef)) {
        match self {
            Expr::Column(col) => f(col),
            Expr::Aggregate { arg, .. } => f(arg),
            Expr::Literal(_) | Expr::Param(_) => {}
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Aggregate { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        op: CompareOp,
        lhs: Expr,
        rhs: Expr,
    },
    IsNull {
        expr: Expr,
        negated: bool,
    },
    InList {
        expr: Expr,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Expr,
        low: Expr,
        high: Expr,
        negated: bool,
    },
    /// SQL LIKE with `\` as escape character
    Like {
        expr: Expr,
        pattern: Expr,
        negated: bool,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Self {
        Predicate::Compare { op, lhs, rhs }
    }

    /// Conjunction; nested conjunctions are flattened
    pub fn and(self, other: Predicate) -> Predicate {
        let mut parts = match self {
            Predicate::And(parts) => parts,
            p => vec![p],
        };
        match other {
            Predicate::And(more) => parts.extend(more),
            p => parts.push(p),
        }
        Predicate::And(parts)
    }

    /// Disjunction; nested disjunctions are flattened
    pub fn or(self, other: Predicate) -> Predicate {
        let mut parts = match self {
            Predicate::Or(parts) => parts,
            p => vec![p],
        };
        match other {
            Predicate::Or(more) => parts.extend(more),
            p => parts.push(p),
        }
        Predicate::Or(parts)
    }

    /// Conjunction of all predicates, `None` when empty
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        predicates.into_iter().reduce(Predicate::and)
    }

    /// Visit every expression operand
    pub fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        match self {
            Predicate::Compare { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            Predicate::IsNull { expr, .. } => f(expr),
            Predicate::InList { expr, list, .. } => {
                f(expr);
                for item in list {
                    f(item);
                }
            }
            Predicate::Between {
                expr, low, high, ..
            } => {
                f(expr);
                f(low);
                f(high);
            }
            Predicate::Like { expr, pattern, .. } => {
                f(expr);
                f(pattern);
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                for p in parts {
                    p.for_each_expr(f);
                }
            }
            Predicate::Not(inner) => inner.for_each_expr(f),
        }
    }

    pub fn has_aggregate(&self) -> bool {
        let mut found = false;
        self.for_each_expr(&mut |e| found |= e.is_aggregate());
        found
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            p => Predicate::Not(Box::new(p)),
        }
    }
}

/// Escape `%`, `_` and `\` so `text` matches literally inside a LIKE pattern
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Sort direction of an ORDER BY key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub expr: Expr,
    pub direction: Direction,
}
