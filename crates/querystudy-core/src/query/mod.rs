//! Query layer: typed paths, predicates, the fluent builder and the
//! textual query parser, all producing an immutable `Query<R>`
//!
//! Nothing in this module touches the store.

pub mod builder;
pub mod entity_path;
pub mod expr;
pub mod model;
pub mod path;
pub mod selection;
pub mod text;

pub use builder::{select, select_from, QueryBuilder};
pub use entity_path::{AssociationPath, EntityPath, OptionalEntity, QMember, QTeam};
pub use expr::{AggregateFn, ColumnRef, CompareOp, Direction, Expr, OrderSpec, Predicate};
pub use model::{
    AssociationRef, ColumnGroup, FetchedAssociation, Join, JoinType, QueryModel, Source,
};
pub use path::{Aggregate, ColumnType, Operand, Path};
pub use selection::{SelectItem, Selection};

use crate::errors::Result;
use crate::mapping::FromRow;
use std::fmt;
use std::marker::PhantomData;

/// A validated query yielding rows of type `R`
pub struct Query<R> {
    model: QueryModel,
    layout: Vec<ColumnGroup>,
    _row: PhantomData<fn() -> R>,
}

impl<R> Clone for Query<R> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            layout: self.layout.clone(),
            _row: PhantomData,
        }
    }
}

impl<R> fmt::Debug for Query<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").field("model", &self.model).finish()
    }
}

impl<R: FromRow> Query<R> {
    /// Validate `model` and compute its row layout
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` when the model fails validation.
    pub fn new(model: QueryModel) -> Result<Self> {
        model.validate()?;
        let layout = model.layout();
        Ok(Self {
            model,
            layout,
            _row: PhantomData,
        })
    }

    /// Parse a textual query
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for syntax errors and invalid references.
    pub fn parse(text: &str) -> Result<Self> {
        Self::new(text::parse(text)?)
    }
}

impl<R> Query<R> {
    pub fn model(&self) -> &QueryModel {
        &self.model
    }

    pub fn layout(&self) -> &[ColumnGroup] {
        &self.layout
    }
}
