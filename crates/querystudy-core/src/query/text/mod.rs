//! Textual queries in a JPQL-like subset
//!
//! ```text
//! select m from Member m join m.team t where t.teamName = :name
//! ```
//!
//! Keywords are case-insensitive. Aliases referenced by `on` and `where`
//! must be declared earlier in the text; select items may use any alias.

mod lexer;
mod parser;

pub use parser::parse;
