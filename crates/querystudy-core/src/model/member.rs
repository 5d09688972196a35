use super::columns;
use super::{Association, Entity, EntityKind, Id, MemberId, Team, TeamId};
use crate::errors::{QueryError, Result};
use crate::value::Value;
use serde::Serialize;
use std::fmt;

/// A member, optionally affiliated with one team
#[derive(Debug, Clone, Default, Serialize)]
pub struct Member {
    id: Option<MemberId>,
    pub username: Option<String>,
    pub age: i32,
    pub team: Association<Team>,
}

impl Member {
    pub fn new(username: impl Into<String>, age: i32, team: Option<&Team>) -> Self {
        Self {
            id: None,
            username: Some(username.into()),
            age,
            team: team.map(Association::to).unwrap_or_default(),
        }
    }

    /// Member with only a username: age 0, no team
    pub fn with_username(username: impl Into<String>) -> Self {
        Self::new(username, 0, None)
    }

    pub fn id(&self) -> Option<MemberId> {
        self.id
    }

    pub fn team_id(&self) -> Option<TeamId> {
        self.team.id()
    }

    pub fn change_team(&mut self, team: &Team) {
        self.team = Association::to(team);
    }

    pub fn leave_team(&mut self) {
        self.team = Association::Absent;
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => std::ptr::eq(self, other),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.map(|id| id.to_string());
        write!(
            f,
            "Member(id={}, username={}, age={})",
            id.as_deref().unwrap_or("null"),
            self.username.as_deref().unwrap_or("null"),
            self.age
        )
    }
}

impl Entity for Member {
    const KIND: EntityKind = EntityKind::Member;

    fn id(&self) -> Option<Id<Self>> {
        self.id
    }

    fn assign_id(&mut self, id: Id<Self>) {
        self.id = Some(id);
    }

    fn check_references(&self) -> Result<()> {
        if let Association::Loaded(team) = &self.team {
            if team.id().is_none() {
                return Err(QueryError::TransientReference {
                    entity: self.to_string(),
                    target: team.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn references(&self) -> Vec<(EntityKind, i64)> {
        self.team_id()
            .map(|id| (EntityKind::Team, i64::from(id)))
            .into_iter()
            .collect()
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            self.id.map(i64::from).into(),
            self.username.clone().into(),
            self.age.into(),
            self.team_id().map(i64::from).into(),
        ]
    }

    fn from_columns(values: &[Value]) -> Result<Self> {
        let kind = Self::KIND;
        let age = columns::integer(values, 2, kind)?;
        let age = i32::try_from(age)
            .map_err(|_| QueryError::projection("Member.age", format!("out of range {}", age)))?;
        let team = match columns::opt_integer(values, 3, kind)? {
            Some(team_id) => Association::Lazy(TeamId::new(team_id)),
            None => Association::Absent,
        };

        Ok(Self {
            id: Some(MemberId::new(columns::integer(values, 0, kind)?)),
            username: columns::opt_text(values, 1, kind)?,
            age,
            team,
        })
    }

    fn attach_fetched(&mut self, association: &str, values: Option<&[Value]>) -> Result<()> {
        if association != "team" {
            return Err(QueryError::projection(
                "Member",
                format!("unknown association {}", association),
            )
            .into());
        }
        match values {
            Some(values) => self.team = Association::Loaded(Team::from_columns(values)?),
            // the row still carries a foreign key, so the team stays reachable
            None if matches!(self.team, Association::Lazy(_)) => {}
            None => self.team = Association::Absent,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    fn persisted_team(id: i64, name: &str) -> Team {
        let mut team = Team::new(name);
        team.assign_id(TeamId::new(id));
        team
    }

    #[test]
    fn test_new_member_holds_loaded_team() {
        let team = persisted_team(1, "teamA");
        let member = Member::new("member1", 10, Some(&team));
        assert!(member.team.is_loaded());
        assert_eq!(member.team_id(), Some(TeamId::new(1)));
    }

    #[test]
    fn test_transient_team_reference_is_rejected() {
        let team = Team::new("teamA");
        let member = Member::new("member1", 10, Some(&team));
        let err = member.check_references().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::TransientReference);
    }

    #[test]
    fn test_from_columns_yields_lazy_team() {
        let values = vec![
            Value::Integer(3),
            Value::from("member3"),
            Value::Integer(30),
            Value::Integer(2),
        ];
        let member = Member::from_columns(&values).unwrap();
        assert_eq!(member.id(), Some(MemberId::new(3)));
        assert!(!member.team.is_loaded());
        assert_eq!(member.team_id(), Some(TeamId::new(2)));
    }

    #[test]
    fn test_from_columns_null_team_is_absent() {
        let values = vec![Value::Integer(5), Value::Null, Value::Integer(0), Value::Null];
        let member = Member::from_columns(&values).unwrap();
        assert!(member.team.is_absent());
        assert_eq!(member.username, None);
    }

    #[test]
    fn test_references_follow_team() {
        let team = persisted_team(4, "teamA");
        let mut member = Member::new("member1", 10, Some(&team));
        assert_eq!(member.references(), vec![(EntityKind::Team, 4)]);
        member.leave_team();
        assert!(member.references().is_empty());
    }

    #[test]
    fn test_from_columns_rejects_short_rows() {
        let err = Member::from_columns(&[Value::Integer(1)]).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::AmbiguousProjection);
    }

    #[test]
    fn test_attach_fetched_team() {
        let mut member = Member::with_username("member1");
        let team = [Value::Integer(1), Value::from("teamA")];
        member.attach_fetched("team", Some(&team)).unwrap();
        assert!(member.team.is_loaded());
        assert_eq!(member.team.get().map(|t| t.team_name.as_str()), Some("teamA"));

        member.attach_fetched("team", None).unwrap();
        assert!(member.team.is_absent());
    }

    #[test]
    fn test_attach_null_fetch_keeps_foreign_key() {
        let values = vec![
            Value::Integer(3),
            Value::from("member3"),
            Value::Integer(30),
            Value::Integer(2),
        ];
        let mut member = Member::from_columns(&values).unwrap();
        member.attach_fetched("team", None).unwrap();
        assert!(!member.team.is_absent());
        assert_eq!(member.team_id(), Some(TeamId::new(2)));
    }

    #[test]
    fn test_change_team() {
        let team_a = persisted_team(1, "teamA");
        let team_b = persisted_team(2, "teamB");
        let mut member = Member::new("member1", 10, Some(&team_a));
        member.change_team(&team_b);
        assert_eq!(member.team_id(), Some(TeamId::new(2)));
        member.leave_team();
        assert!(member.team.is_absent());
    }
}
