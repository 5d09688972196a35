//! Hand-written table metadata for the two entities
//!
//! Column order here is the order used by `Entity::column_values`, by the
//! SQL compiler's select lists and by row decoding.

/// The persistent entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Member,
    Team,
}

/// Storage class of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Text,
}

/// A queryable scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Rust field name
    pub name: &'static str,
    /// Name accepted in textual queries besides `name`
    pub query_name: &'static str,
    pub column: &'static str,
    pub kind: ValueKind,
    pub nullable: bool,
}

/// A many-to-one reference stored as a foreign key column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationMeta {
    pub name: &'static str,
    pub owner: EntityKind,
    pub fk_column: &'static str,
    pub target: EntityKind,
}

const MEMBER_FIELDS: &[FieldMeta] = &[
    FieldMeta {
        name: "id",
        query_name: "id",
        column: "member_id",
        kind: ValueKind::Integer,
        nullable: false,
    },
    FieldMeta {
        name: "username",
        query_name: "username",
        column: "username",
        kind: ValueKind::Text,
        nullable: true,
    },
    FieldMeta {
        name: "age",
        query_name: "age",
        column: "age",
        kind: ValueKind::Integer,
        nullable: false,
    },
];

const TEAM_FIELDS: &[FieldMeta] = &[
    FieldMeta {
        name: "id",
        query_name: "id",
        column: "team_id",
        kind: ValueKind::Integer,
        nullable: false,
    },
    FieldMeta {
        name: "team_name",
        query_name: "teamName",
        column: "team_name",
        kind: ValueKind::Text,
        nullable: false,
    },
];

const MEMBER_ASSOCIATIONS: &[AssociationMeta] = &[AssociationMeta {
    name: "team",
    owner: EntityKind::Member,
    fk_column: "team_id",
    target: EntityKind::Team,
}];

impl EntityKind {
    /// Entity name as written in textual queries
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Member => "Member",
            EntityKind::Team => "Team",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Member" => Some(EntityKind::Member),
            "Team" => Some(EntityKind::Team),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Member => "member",
            EntityKind::Team => "team",
        }
    }

    /// All stored columns, identity first
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Member => &["member_id", "username", "age", "team_id"],
            EntityKind::Team => &["team_id", "team_name"],
        }
    }

    pub fn id_column(&self) -> &'static str {
        self.columns()[0]
    }

    pub fn fields(&self) -> &'static [FieldMeta] {
        match self {
            EntityKind::Member => MEMBER_FIELDS,
            EntityKind::Team => TEAM_FIELDS,
        }
    }

    /// Look a field up by its Rust name or its query name
    pub fn field(&self, name: &str) -> Option<&'static FieldMeta> {
        self.fields()
            .iter()
            .find(|f| f.name == name || f.query_name == name)
    }

    pub fn associations(&self) -> &'static [AssociationMeta] {
        match self {
            EntityKind::Member => MEMBER_ASSOCIATIONS,
            EntityKind::Team => &[],
        }
    }

    pub fn association(&self, name: &str) -> Option<&'static AssociationMeta> {
        self.associations().iter().find(|a| a.name == name)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup_accepts_query_name() {
        let by_rust = EntityKind::Team.field("team_name").unwrap();
        let by_query = EntityKind::Team.field("teamName").unwrap();
        assert_eq!(by_rust, by_query);
        assert_eq!(by_rust.column, "team_name");
    }

    #[test]
    fn test_association_metadata() {
        let assoc = EntityKind::Member.association("team").unwrap();
        assert_eq!(assoc.target, EntityKind::Team);
        assert_eq!(assoc.fk_column, "team_id");
        assert!(EntityKind::Team.association("members").is_none());
    }

    #[test]
    fn test_identity_is_first_column() {
        assert_eq!(EntityKind::Member.id_column(), "member_id");
        assert_eq!(EntityKind::Team.id_column(), "team_id");
        assert_eq!(
            EntityKind::Member.field("id").map(|f| f.column),
            Some(EntityKind::Member.id_column())
        );
    }
}
