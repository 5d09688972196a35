//! What a query selects, and the Rust type each selection decodes to

use super::entity_path::{EntityPath, OptionalEntity, QMember, QTeam};
use super::expr::Expr;
use super::path::{Aggregate, ColumnType, Path};
use crate::mapping::FromRow;
use crate::model::{EntityKind, Member, Team};

/// One item of the select clause
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// All columns of an aliased entity
    Entity { alias: String, kind: EntityKind },
    /// A single scalar column or aggregate
    Expr(Expr),
}

impl SelectItem {
    pub fn entity(path: &impl EntityPath) -> Self {
        SelectItem::Entity {
            alias: path.alias().to_string(),
            kind: path.kind(),
        }
    }
}

/// A typed selection; `Output` is the row type the query yields
pub trait Selection {
    type Output: FromRow;

    fn items(&self) -> Vec<SelectItem>;
}

impl<S: Selection> Selection for &S {
    type Output = S::Output;

    fn items(&self) -> Vec<SelectItem> {
        (**self).items()
    }
}

impl Selection for QMember {
    type Output = Member;

    fn items(&self) -> Vec<SelectItem> {
        vec![SelectItem::entity(self)]
    }
}

impl Selection for QTeam {
    type Output = Team;

    fn items(&self) -> Vec<SelectItem> {
        vec![SelectItem::entity(self)]
    }
}

impl<E> Selection for OptionalEntity<E>
where
    E: EntityPath + Selection,
{
    type Output = Option<E::Output>;

    fn items(&self) -> Vec<SelectItem> {
        self.0.items()
    }
}

impl<T> Selection for Path<T>
where
    T: ColumnType + FromRow,
{
    type Output = T;

    fn items(&self) -> Vec<SelectItem> {
        vec![SelectItem::Expr(self.expr())]
    }
}

impl<O: FromRow> Selection for Aggregate<O> {
    type Output = O;

    fn items(&self) -> Vec<SelectItem> {
        vec![SelectItem::Expr(self.expr())]
    }
}

macro_rules! tuple_selection {
    ($($name:ident),+) => {
        impl<$($name: Selection),+> Selection for ($($name,)+) {
            type Output = ($($name::Output,)+);

            #[allow(non_snake_case)]
            fn items(&self) -> Vec<SelectItem> {
                let ($($name,)+) = self;
                let mut items = Vec::new();
                $(items.extend($name.items());)+
                items
            }
        }
    };
}

tuple_selection!(A, B);
tuple_selection!(A, B, C);
tuple_selection!(A, B, C, D);
