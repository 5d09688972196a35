//! querystudy core: entity model, query layer and row mapping
//!
//! Queries are built either with the typed builder
//!
//! ```
//! use querystudy_core::query::{select_from, QMember, QTeam};
//!
//! let m = QMember::new("m");
//! let t = QTeam::new("t");
//! let query = select_from(&m)
//!     .join(&m.team, &t)
//!     .filter(t.team_name.eq("teamA"))
//!     .build()
//!     .unwrap();
//! assert_eq!(query.model().joins.len(), 1);
//! ```
//!
//! or from text with `Query::parse`. Execution goes through a `RowSource`,
//! implemented by the store crate's session.

pub mod errors;
pub mod exec;
pub mod logging_facility;
pub mod mapping;
pub mod model;
pub mod query;
pub mod value;

pub use errors::{ExError, ExErrorKind, QueryError, Result};
pub use exec::{Parameters, ResultIter, RowSource};
pub use mapping::{DynamicRow, FromRow};
pub use model::{Association, Entity, EntityKind, Member, MemberId, Team, TeamId};
pub use query::{select, select_from, Query, QueryBuilder};
pub use value::Value;
