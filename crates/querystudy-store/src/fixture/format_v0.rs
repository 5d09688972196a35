//! Fixture format v0 schema

use serde::{Deserialize, Serialize};

/// Top-level fixture file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureV0 {
    /// Schema version (must be 0 for this format)
    pub schema_version: u32,

    #[serde(default)]
    pub teams: Vec<FixtureTeam>,

    #[serde(default)]
    pub members: Vec<FixtureMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureTeam {
    /// Team name, unique within the fixture
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureMember {
    pub username: Option<String>,

    #[serde(default)]
    pub age: i32,

    /// Name of a team declared in the same fixture
    #[serde(default)]
    pub team: Option<String>,
}
