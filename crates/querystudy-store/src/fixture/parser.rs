//! Fixture parser with validation
//!
//! Parses YAML and validates the schema version, team name uniqueness and
//! member team references

use crate::errors::{fixture_validation, Result};
use crate::fixture::format_v0::FixtureV0;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Parse a fixture file from a path
pub fn parse_fixture_file(path: &Path) -> Result<FixtureV0> {
    let content = fs::read_to_string(path)
        .map_err(|e| fixture_validation(&format!("Failed to read fixture file: {}", e)))?;

    parse_fixture_str(&content)
}

/// Parse a fixture from a string
pub fn parse_fixture_str(content: &str) -> Result<FixtureV0> {
    let fixture: FixtureV0 = serde_yaml::from_str(content)
        .map_err(|e| fixture_validation(&format!("YAML parse error: {}", e)))?;

    validate_fixture(&fixture)?;

    Ok(fixture)
}

fn validate_fixture(fixture: &FixtureV0) -> Result<()> {
    if fixture.schema_version != 0 {
        return Err(fixture_validation(&format!(
            "Unsupported schema_version: {}. Expected 0",
            fixture.schema_version
        )));
    }

    let mut names = HashSet::new();
    for team in &fixture.teams {
        if !names.insert(team.name.as_str()) {
            return Err(fixture_validation(&format!(
                "Duplicate team name: {}",
                team.name
            )));
        }
    }

    for member in &fixture.members {
        if let Some(team) = &member.team {
            if !names.contains(team.as_str()) {
                return Err(fixture_validation(&format!(
                    "Member {} references undeclared team: {}",
                    member.username.as_deref().unwrap_or("<unnamed>"),
                    team
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use querystudy_core::ExErrorKind;

    const VALID: &str = r#"
schema_version: 0
teams:
  - name: teamA
  - name: teamB
members:
  - username: member1
    age: 10
    team: teamA
  - username: loner
"#;

    #[test]
    fn test_parse_valid_fixture() {
        let fixture = parse_fixture_str(VALID).unwrap();
        assert_eq!(fixture.teams.len(), 2);
        assert_eq!(fixture.members[0].team.as_deref(), Some("teamA"));
        assert_eq!(fixture.members[1].age, 0);
        assert!(fixture.members[1].team.is_none());
    }

    #[test]
    fn test_unsupported_version() {
        let err = parse_fixture_str("schema_version: 1\n").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert!(err.message().contains("schema_version"));
    }

    #[test]
    fn test_duplicate_team_name() {
        let yaml = "schema_version: 0\nteams:\n  - name: teamA\n  - name: teamA\n";
        let err = parse_fixture_str(yaml).unwrap_err();
        assert!(err.message().contains("Duplicate team name"));
    }

    #[test]
    fn test_undeclared_team() {
        let yaml = "schema_version: 0\nmembers:\n  - username: member1\n    team: teamZ\n";
        let err = parse_fixture_str(yaml).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert!(err.message().contains("teamZ"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "schema_version: 0\nprojects: []\n";
        assert!(parse_fixture_str(yaml).is_err());
    }
}
