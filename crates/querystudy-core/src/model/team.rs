use super::columns;
use super::{Entity, EntityKind, Id, TeamId};
use crate::errors::Result;
use crate::value::Value;
use serde::Serialize;
use std::fmt;

/// A team; its members are looked up on demand by foreign key
#[derive(Debug, Clone, Serialize)]
pub struct Team {
    id: Option<TeamId>,
    pub team_name: String,
}

impl Team {
    pub fn new(team_name: impl Into<String>) -> Self {
        Self {
            id: None,
            team_name: team_name.into(),
        }
    }

    pub fn id(&self) -> Option<TeamId> {
        self.id
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => std::ptr::eq(self, other),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Team(id={}, teamName={})", id, self.team_name),
            None => write!(f, "Team(id=null, teamName={})", self.team_name),
        }
    }
}

impl Entity for Team {
    const KIND: EntityKind = EntityKind::Team;

    fn id(&self) -> Option<Id<Self>> {
        self.id
    }

    fn assign_id(&mut self, id: Id<Self>) {
        self.id = Some(id);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            self.id.map(i64::from).into(),
            Value::Text(self.team_name.clone()),
        ]
    }

    fn from_columns(values: &[Value]) -> Result<Self> {
        let kind = Self::KIND;
        Ok(Self {
            id: Some(TeamId::new(columns::integer(values, 0, kind)?)),
            team_name: columns::text(values, 1, kind)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_by_id() {
        let mut a = Team::new("teamA");
        let mut b = Team::new("renamed");
        a.assign_id(TeamId::new(1));
        b.assign_id(TeamId::new(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_transient_teams_are_distinct() {
        let a = Team::new("teamA");
        let b = Team::new("teamA");
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_column_round_trip() {
        let mut team = Team::new("teamB");
        team.assign_id(TeamId::new(4));
        let loaded = Team::from_columns(&team.column_values()).unwrap();
        assert_eq!(loaded.id(), Some(TeamId::new(4)));
        assert_eq!(loaded.team_name, "teamB");
    }
}
