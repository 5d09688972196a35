//! The immutable query description and its validation

use super::expr::{ColumnRef, Expr, OrderSpec, Predicate};
use super::selection::SelectItem;
use crate::errors::{QueryError, Result};
use crate::mapping::Slot;
use crate::model::{AssociationMeta, EntityKind};
use std::collections::{BTreeSet, HashMap};

/// An aliased entity in the `from` clause or as a join target
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub kind: EntityKind,
    pub alias: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

/// Association traversed by a join, `owner_alias.meta.name`
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationRef {
    pub owner_alias: String,
    pub meta: &'static AssociationMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub target: Source,
    /// `None` for an entity (theta) join
    pub association: Option<AssociationRef>,
    /// Extra condition; the only condition of an entity join
    pub on: Option<Predicate>,
    /// Populate the association from this join's columns
    pub fetch: bool,
}

/// Everything a query says, independent of how it was built
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryModel {
    pub select: Vec<SelectItem>,
    pub from: Vec<Source>,
    pub joins: Vec<Join>,
    pub filter: Option<Predicate>,
    pub group_by: Vec<Expr>,
    pub having: Option<Predicate>,
    pub order_by: Vec<OrderSpec>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// Columns of a fetched association, appended to the owner's columns
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAssociation {
    pub association: &'static str,
    pub alias: String,
    pub kind: EntityKind,
}

/// The contiguous columns one select item occupies in a result row
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGroup {
    pub item: SelectItem,
    pub fetched: Vec<FetchedAssociation>,
}

impl ColumnGroup {
    pub fn width(&self) -> usize {
        let own = match &self.item {
            SelectItem::Entity { kind, .. } => kind.columns().len(),
            SelectItem::Expr(_) => 1,
        };
        own + self
            .fetched
            .iter()
            .map(|f| f.kind.columns().len())
            .sum::<usize>()
    }

    pub fn slot(&self) -> Slot {
        match &self.item {
            SelectItem::Entity { kind, .. } => Slot::Entity(*kind),
            SelectItem::Expr(_) => Slot::Scalar,
        }
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

type Scope = HashMap<String, EntityKind>;

fn check_column(scope: &Scope, col: &ColumnRef, clause: &str) -> Result<()> {
    match scope.get(&col.alias) {
        None => Err(QueryError::invalid(
            clause,
            format!("alias {} is not declared at this point", col.alias),
        )
        .into()),
        Some(kind) if *kind != col.entity => Err(QueryError::invalid(
            clause,
            format!("alias {} is a {}, not a {}", col.alias, kind, col.entity),
        )
        .into()),
        Some(_) => Ok(()),
    }
}

fn check_expr(scope: &Scope, expr: &Expr, clause: &str, aggregates: bool) -> Result<()> {
    if expr.is_aggregate() && !aggregates {
        return Err(QueryError::invalid(clause, "aggregate functions are not allowed here").into());
    }
    let mut result = Ok(());
    expr.for_each_column(&mut |col| {
        if result.is_ok() {
            result = check_column(scope, col, clause);
        }
    });
    result
}

fn check_predicate(scope: &Scope, pred: &Predicate, clause: &str, aggregates: bool) -> Result<()> {
    let mut result = Ok(());
    pred.for_each_expr(&mut |expr| {
        if result.is_ok() {
            result = check_expr(scope, expr, clause, aggregates);
        }
    });
    result
}

impl QueryModel {
    /// Check that every clause only references aliases in scope and that
    /// joins and fetch markers are well formed
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` naming the offending clause.
    pub fn validate(&self) -> Result<()> {
        if self.from.is_empty() {
            return Err(QueryError::invalid("from", "no source entity given").into());
        }
        if self.select.is_empty() {
            return Err(QueryError::invalid("select", "nothing selected").into());
        }

        let mut scope = Scope::new();
        for source in &self.from {
            declare(&mut scope, source, "from")?;
        }

        for join in &self.joins {
            if let Some(assoc) = &join.association {
                match scope.get(&assoc.owner_alias) {
                    None => {
                        return Err(QueryError::invalid(
                            "join",
                            format!("alias {} is not declared at this point", assoc.owner_alias),
                        )
                        .into())
                    }
                    Some(kind) if *kind != assoc.meta.owner => {
                        return Err(QueryError::invalid(
                            "join",
                            format!("{} has no association {}", kind, assoc.meta.name),
                        )
                        .into())
                    }
                    Some(_) => {}
                }
                if join.target.kind != assoc.meta.target {
                    return Err(QueryError::invalid(
                        "join",
                        format!(
                            "{}.{} targets {}, not {}",
                            assoc.owner_alias, assoc.meta.name, assoc.meta.target, join.target.kind
                        ),
                    )
                    .into());
                }
            } else {
                if join.on.is_none() {
                    return Err(QueryError::invalid(
                        "join",
                        format!("entity join to {} requires an on condition", join.target.alias),
                    )
                    .into());
                }
                if join.fetch {
                    return Err(QueryError::invalid(
                        "join",
                        "fetch is only allowed on association joins",
                    )
                    .into());
                }
            }

            if join.fetch && join.on.is_some() {
                return Err(QueryError::invalid(
                    "on",
                    format!("fetch join to {} cannot carry an on restriction", join.target.alias),
                )
                .into());
            }

            declare(&mut scope, &join.target, "join")?;
            if let Some(on) = &join.on {
                check_predicate(&scope, on, "on", false)?;
            }
        }

        for item in &self.select {
            match item {
                SelectItem::Entity { alias, kind } => {
                    check_column(&scope, &ColumnRef::id(alias.clone(), *kind), "select")?
                }
                SelectItem::Expr(expr) => check_expr(&scope, expr, "select", true)?,
            }
        }

        for join in self.joins.iter().filter(|j| j.fetch) {
            let owner = join
                .association
                .as_ref()
                .map(|a| a.owner_alias.as_str())
                .unwrap_or_default();
            let selected = self
                .select
                .iter()
                .any(|item| matches!(item, SelectItem::Entity { alias, .. } if alias == owner));
            if !selected {
                return Err(QueryError::invalid(
                    "join",
                    format!("fetch join requires {} to be selected as an entity", owner),
                )
                .into());
            }
        }

        if let Some(filter) = &self.filter {
            check_predicate(&scope, filter, "where", false)?;
        }
        for key in &self.group_by {
            check_expr(&scope, key, "group by", false)?;
        }
        if let Some(having) = &self.having {
            if self.group_by.is_empty() {
                return Err(QueryError::invalid("having", "having requires group by").into());
            }
            check_predicate(&scope, having, "having", true)?;
        }
        for spec in &self.order_by {
            check_expr(&scope, &spec.expr, "order by", true)?;
        }
        Ok(())
    }

    /// Column groups of a result row, in select order
    pub fn layout(&self) -> Vec<ColumnGroup> {
        self.select
            .iter()
            .map(|item| {
                let fetched = match item {
                    SelectItem::Entity { alias, .. } => self
                        .joins
                        .iter()
                        .filter(|j| j.fetch)
                        .filter_map(|j| {
                            let assoc = j.association.as_ref()?;
                            (assoc.owner_alias == *alias).then(|| FetchedAssociation {
                                association: assoc.meta.name,
                                alias: j.target.alias.clone(),
                                kind: j.target.kind,
                            })
                        })
                        .collect(),
                    SelectItem::Expr(_) => Vec::new(),
                };
                ColumnGroup {
                    item: item.clone(),
                    fetched,
                }
            })
            .collect()
    }

    /// Whether any select item is an aggregate
    pub fn is_aggregate(&self) -> bool {
        self.select
            .iter()
            .any(|item| matches!(item, SelectItem::Expr(e) if e.is_aggregate()))
    }

    /// Names of all named parameters referenced anywhere in the query
    pub fn parameter_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let mut visit = |expr: &Expr| {
            if let Expr::Param(name) = expr {
                names.insert(name.clone());
            }
        };
        for item in &self.select {
            if let SelectItem::Expr(expr) = item {
                visit(expr);
            }
        }
        let predicates = self
            .joins
            .iter()
            .filter_map(|j| j.on.as_ref())
            .chain(self.filter.as_ref())
            .chain(self.having.as_ref());
        for pred in predicates {
            pred.for_each_expr(&mut visit);
        }
        names
    }
}

fn declare(scope: &mut Scope, source: &Source, clause: &str) -> Result<()> {
    if !is_identifier(&source.alias) {
        return Err(QueryError::invalid(clause, format!("invalid alias '{}'", source.alias)).into());
    }
    if scope.insert(source.alias.clone(), source.kind).is_some() {
        return Err(QueryError::invalid(
            clause,
            format!("alias {} is declared twice", source.alias),
        )
        .into());
    }
    Ok(())
}
