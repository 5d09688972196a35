//! Hand-written query metamodel for Member and Team

use super::expr::ColumnRef;
use super::path::{Aggregate, ColumnType, Path};
use crate::model::{AssociationMeta, Entity, EntityKind, Member, Team};
use std::marker::PhantomData;

/// An entity bound to a query alias
pub trait EntityPath {
    type Entity: Entity;

    fn alias(&self) -> &str;

    fn kind(&self) -> EntityKind {
        Self::Entity::KIND
    }
}

fn field<T: ColumnType>(alias: &str, kind: EntityKind, name: &str) -> Path<T> {
    let meta = kind
        .field(name)
        .unwrap_or_else(|| panic!("{} has no field {}", kind, name));
    Path::new(ColumnRef::field(alias, kind, meta))
}

/// A many-to-one association reachable from an aliased owner
#[derive(Debug)]
pub struct AssociationPath<T> {
    owner_alias: String,
    meta: &'static AssociationMeta,
    _target: PhantomData<fn() -> T>,
}

impl<T> Clone for AssociationPath<T> {
    fn clone(&self) -> Self {
        Self {
            owner_alias: self.owner_alias.clone(),
            meta: self.meta,
            _target: PhantomData,
        }
    }
}

impl<T: Entity> AssociationPath<T> {
    fn new(owner_alias: &str, owner: EntityKind, name: &str) -> Self {
        let meta = owner
            .association(name)
            .unwrap_or_else(|| panic!("{} has no association {}", owner, name));
        debug_assert_eq!(meta.target, T::KIND);
        Self {
            owner_alias: owner_alias.to_string(),
            meta,
            _target: PhantomData,
        }
    }

    pub fn owner_alias(&self) -> &str {
        &self.owner_alias
    }

    pub fn meta(&self) -> &'static AssociationMeta {
        self.meta
    }
}

/// Query path over `Member`
#[derive(Debug, Clone)]
pub struct QMember {
    alias: String,
    pub id: Path<i64>,
    pub username: Path<Option<String>>,
    pub age: Path<i32>,
    pub team: AssociationPath<Team>,
}

impl QMember {
    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let kind = EntityKind::Member;
        Self {
            id: field(&alias, kind, "id"),
            username: field(&alias, kind, "username"),
            age: field(&alias, kind, "age"),
            team: AssociationPath::new(&alias, kind, "team"),
            alias,
        }
    }

    /// Default instance, aliased `member`
    pub fn member() -> Self {
        Self::new("member")
    }

    /// Number of member rows
    pub fn count(&self) -> Aggregate<i64> {
        self.id.count()
    }

    /// Select this member as nullable (right side of a left join)
    pub fn optional(&self) -> OptionalEntity<QMember> {
        OptionalEntity(self.clone())
    }
}

impl EntityPath for QMember {
    type Entity = Member;

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Query path over `Team`
#[derive(Debug, Clone)]
pub struct QTeam {
    alias: String,
    pub id: Path<i64>,
    pub team_name: Path<String>,
}

impl QTeam {
    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let kind = EntityKind::Team;
        Self {
            id: field(&alias, kind, "id"),
            team_name: field(&alias, kind, "team_name"),
            alias,
        }
    }

    /// Default instance, aliased `team`
    pub fn team() -> Self {
        Self::new("team")
    }

    pub fn count(&self) -> Aggregate<i64> {
        self.id.count()
    }

    /// Select this team as nullable (right side of a left join)
    pub fn optional(&self) -> OptionalEntity<QTeam> {
        OptionalEntity(self.clone())
    }
}

impl EntityPath for QTeam {
    type Entity = Team;

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// An entity selection that decodes to `None` when the row carries no
/// entity for that alias
#[derive(Debug, Clone)]
pub struct OptionalEntity<E>(pub(crate) E);
