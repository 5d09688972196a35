//! Fixture importer orchestration

use crate::config::FlushMode;
use crate::errors::Result;
use crate::fixture::format_v0::FixtureV0;
use crate::fixture::parse_fixture_file;
use crate::session::Session;
use querystudy_core::model::{Member, Team};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Identities assigned by one import, in fixture order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub teams: Vec<(String, i64)>,
    pub members: Vec<(Option<String>, i64)>,
}

/// Persist every team, then every member, through `session`
///
/// Nothing is flushed here; the caller decides when to flush or commit.
pub fn import_fixture(session: &mut Session<'_>, fixture: &FixtureV0) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let mut teams: HashMap<&str, Team> = HashMap::new();

    for entry in &fixture.teams {
        let mut team = Team::new(entry.name.clone());
        let id = session.persist(&mut team)?;
        report.teams.push((entry.name.clone(), id.get()));
        teams.insert(entry.name.as_str(), team);
    }

    for entry in &fixture.members {
        let team = entry.team.as_deref().and_then(|name| teams.get(name));
        let mut member = Member::new(String::new(), entry.age, team);
        member.username = entry.username.clone();
        let id = session.persist(&mut member)?;
        report.members.push((entry.username.clone(), id.get()));
    }

    Ok(report)
}

/// Parse `path` and import it in its own committed session
pub fn import_fixture_file(path: &Path, conn: &mut Connection) -> Result<ImportReport> {
    let fixture = parse_fixture_file(path)?;
    let mut session = Session::begin(conn, FlushMode::Auto)?;
    let report = import_fixture(&mut session, &fixture)?;
    session.commit()?;
    Ok(report)
}
