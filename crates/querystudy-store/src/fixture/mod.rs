//! YAML fixtures of teams and members
//!
//! Provides:
//! - Fixture format v0 schema
//! - YAML parser with validation
//! - Importer persisting through a session

pub mod format_v0;
pub mod importer;
pub mod parser;

pub use format_v0::{FixtureMember, FixtureTeam, FixtureV0};
pub use importer::{import_fixture, import_fixture_file, ImportReport};
pub use parser::{parse_fixture_file, parse_fixture_str};
