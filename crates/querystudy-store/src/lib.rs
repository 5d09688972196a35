//! querystudy store: SQLite persistence for the query layer
//!
//! Provides the `Session` unit of work, the SQL compiler behind it,
//! configuration, embedded migrations and YAML fixtures.

pub mod config;
pub mod db;
pub mod errors;
pub mod fixture;
pub mod migrations;
pub mod session;
pub mod sql;

pub use config::{FlushMode, StoreConfig};
pub use session::{Session, TextQuery};
