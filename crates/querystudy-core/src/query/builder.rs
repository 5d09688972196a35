//! Fluent construction of typed queries

use super::entity_path::{AssociationPath, EntityPath};
use super::expr::{OrderSpec, Predicate};
use super::model::{AssociationRef, Join, JoinType, QueryModel, Source};
use super::path::{ColumnType, Path};
use super::selection::Selection;
use super::Query;
use crate::errors::{ExError, QueryError, Result};
use crate::mapping::FromRow;
use crate::model::Entity;
use std::marker::PhantomData;

/// Start a query selecting `selection`; sources are added with `from`
pub fn select<S: Selection>(selection: S) -> QueryBuilder<S::Output> {
    QueryBuilder {
        model: QueryModel {
            select: selection.items(),
            ..QueryModel::default()
        },
        error: None,
        _row: PhantomData,
    }
}

/// Start a query selecting `entity` from itself
pub fn select_from<E>(entity: &E) -> QueryBuilder<E::Output>
where
    E: EntityPath + Selection,
{
    select(entity).from(entity)
}

/// Builder for a `Query<R>`
///
/// Misuse such as `on` without a preceding join is recorded and reported
/// by `build`, so chains never panic.
#[derive(Debug, Clone)]
pub struct QueryBuilder<R> {
    model: QueryModel,
    error: Option<ExError>,
    _row: PhantomData<fn() -> R>,
}

impl<R> QueryBuilder<R> {
    fn fail(&mut self, clause: &str, reason: &str) {
        if self.error.is_none() {
            self.error = Some(QueryError::invalid(clause, reason).into());
        }
    }

    /// Add a source entity; several sources form a cross join
    pub fn from<E: EntityPath>(mut self, entity: &E) -> Self {
        self.model.from.push(Source {
            kind: entity.kind(),
            alias: entity.alias().to_string(),
        });
        self
    }

    fn push_association<T, E>(
        mut self,
        join_type: JoinType,
        association: &AssociationPath<T>,
        target: &E,
    ) -> Self
    where
        T: Entity,
        E: EntityPath<Entity = T>,
    {
        self.model.joins.push(Join {
            join_type,
            target: Source {
                kind: target.kind(),
                alias: target.alias().to_string(),
            },
            association: Some(AssociationRef {
                owner_alias: association.owner_alias().to_string(),
                meta: association.meta(),
            }),
            on: None,
            fetch: false,
        });
        self
    }

    fn push_entity<E: EntityPath>(mut self, join_type: JoinType, target: &E) -> Self {
        self.model.joins.push(Join {
            join_type,
            target: Source {
                kind: target.kind(),
                alias: target.alias().to_string(),
            },
            association: None,
            on: None,
            fetch: false,
        });
        self
    }

    /// Inner join along an association, binding `target` as its alias
    pub fn join<T, E>(self, association: &AssociationPath<T>, target: &E) -> Self
    where
        T: Entity,
        E: EntityPath<Entity = T>,
    {
        self.push_association(JoinType::Inner, association, target)
    }

    pub fn inner_join<T, E>(self, association: &AssociationPath<T>, target: &E) -> Self
    where
        T: Entity,
        E: EntityPath<Entity = T>,
    {
        self.push_association(JoinType::Inner, association, target)
    }

    pub fn left_join<T, E>(self, association: &AssociationPath<T>, target: &E) -> Self
    where
        T: Entity,
        E: EntityPath<Entity = T>,
    {
        self.push_association(JoinType::Left, association, target)
    }

    /// Inner join to an unrelated entity; the condition is given by `on`
    pub fn join_entity<E: EntityPath>(self, target: &E) -> Self {
        self.push_entity(JoinType::Inner, target)
    }

    pub fn left_join_entity<E: EntityPath>(self, target: &E) -> Self {
        self.push_entity(JoinType::Left, target)
    }

    /// Condition of the most recent join
    pub fn on(mut self, predicate: Predicate) -> Self {
        match self.model.joins.last_mut() {
            Some(join) => {
                join.on = Some(match join.on.take() {
                    Some(existing) => existing.and(predicate),
                    None => predicate,
                })
            }
            None => self.fail("on", "on without a preceding join"),
        }
        self
    }

    /// Mark the most recent join as eager
    pub fn fetch_join(mut self) -> Self {
        match self.model.joins.last_mut() {
            Some(join) => join.fetch = true,
            None => self.fail("join", "fetch_join without a preceding join"),
        }
        self
    }

    /// Add a filter condition; repeated calls are combined with AND
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.model.filter = Some(match self.model.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Add several filter conditions at once, combined with AND
    pub fn filter_all(self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        match Predicate::all(predicates) {
            Some(predicate) => self.filter(predicate),
            None => self,
        }
    }

    pub fn group_by<T: ColumnType>(mut self, key: &Path<T>) -> Self {
        self.model.group_by.push(key.expr());
        self
    }

    pub fn having(mut self, predicate: Predicate) -> Self {
        self.model.having = Some(match self.model.having.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.model.order_by.push(spec);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.model.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.model.limit = Some(limit);
        self
    }

    /// The model as built so far
    pub fn model(&self) -> &QueryModel {
        &self.model
    }
}

impl<R: FromRow> QueryBuilder<R> {
    /// Validate and freeze the query
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for the first misuse recorded while building
    /// or the first validation failure.
    pub fn build(self) -> Result<Query<R>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Query::new(self.model)
    }
}
