use querystudy_core_types::SessionId;
use thiserror::Error;

/// Result type alias using the canonical ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Query construction
    InvalidQuery,
    AmbiguousProjection,

    // Execution
    NoUniqueResult,
    StoreUnavailable,

    // Entity lifecycle
    InvalidInput,
    TransientReference,
    AlreadyPersisted,
    NotFound,

    // Integration/IO
    Io,
    Persistence,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidQuery => "ERR_INVALID_QUERY",
            ExErrorKind::AmbiguousProjection => "ERR_AMBIGUOUS_PROJECTION",
            ExErrorKind::NoUniqueResult => "ERR_NO_UNIQUE_RESULT",
            ExErrorKind::StoreUnavailable => "ERR_STORE_UNAVAILABLE",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::TransientReference => "ERR_TRANSIENT_REFERENCE",
            ExErrorKind::AlreadyPersisted => "ERR_ALREADY_PERSISTED",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus enough context (operation, entity,
/// query clause) to diagnose a failure without re-running it.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    clause: Option<String>,
    session_id: Option<SessionId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            clause: None,
            session_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (entity name, optionally with id)
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add query clause context (`from`, `join`, `where`, ...)
    pub fn with_clause(mut self, clause: impl Into<String>) -> Self {
        self.clause = Some(clause.into());
        self
    }

    /// Add session context
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Get the clause context, if any
    pub fn clause(&self) -> Option<&str> {
        self.clause.as_deref()
    }

    /// Get the session context, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(clause) = &self.clause {
            write!(f, " (clause: {})", clause)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures raised by the query, mapping and session layers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A clause is malformed or references something outside the query scope
    #[error("Invalid query in {clause} clause: {reason}")]
    InvalidQuery { clause: String, reason: String },

    /// Textual query could not be tokenized or parsed
    #[error("Syntax error at position {position}: {reason}")]
    Syntax { position: usize, reason: String },

    /// A named parameter was referenced but never bound
    #[error("Parameter :{name} is not bound")]
    MissingParameter { name: String },

    /// Selected columns cannot be decoded into the requested result type
    #[error("Cannot map selection to {expected}: found {found}")]
    AmbiguousProjection { expected: String, found: String },

    /// A single-result fetch matched zero or several rows
    #[error("Expected exactly one result, found {count}")]
    NoUniqueResult { count: usize },

    /// The backing store could not be reached or failed mid-operation
    #[error("Store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// An entity references another entity that has no identity yet
    #[error("{entity} references a transient {target}")]
    TransientReference { entity: String, target: String },

    /// Persist was called on an entity that already has an identity
    #[error("{entity} is already persisted with id {id}")]
    AlreadyPersisted { entity: String, id: i64 },

    /// Lookup by identity found nothing
    #[error("{entity} not found: {id}")]
    EntityNotFound { entity: String, id: i64 },
}

/// Conversion from QueryError to ExError
impl From<QueryError> for ExError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidQuery { clause, reason } => ExError::new(ExErrorKind::InvalidQuery)
                .with_clause(clause)
                .with_message(reason),
            QueryError::Syntax { position, reason } => ExError::new(ExErrorKind::InvalidQuery)
                .with_op("parse_query")
                .with_message(format!("at position {}: {}", position, reason)),
            QueryError::MissingParameter { name } => ExError::new(ExErrorKind::InvalidQuery)
                .with_clause("parameters")
                .with_message(format!("Parameter :{} is not bound", name)),
            QueryError::AmbiguousProjection { expected, found } => {
                ExError::new(ExErrorKind::AmbiguousProjection)
                    .with_entity(expected.clone())
                    .with_message(format!("Cannot map selection to {}: found {}", expected, found))
            }
            QueryError::NoUniqueResult { count } => ExError::new(ExErrorKind::NoUniqueResult)
                .with_message(format!("Expected exactly one result, found {}", count)),
            QueryError::StoreUnavailable { reason } => {
                ExError::new(ExErrorKind::StoreUnavailable).with_message(reason)
            }
            QueryError::TransientReference { entity, target } => {
                ExError::new(ExErrorKind::TransientReference)
                    .with_entity(entity)
                    .with_message(format!("References a transient {}", target))
            }
            QueryError::AlreadyPersisted { entity, id } => {
                ExError::new(ExErrorKind::AlreadyPersisted)
                    .with_entity(format!("{}#{}", entity, id))
                    .with_message("Entity already has an identity")
            }
            QueryError::EntityNotFound { entity, id } => ExError::new(ExErrorKind::NotFound)
                .with_entity(format!("{}#{}", entity, id))
                .with_message("Entity not found"),
        }
    }
}

impl QueryError {
    /// Shorthand for `InvalidQuery`
    pub fn invalid(clause: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::InvalidQuery {
            clause: clause.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for `AmbiguousProjection`
    pub fn projection(expected: impl Into<String>, found: impl Into<String>) -> Self {
        QueryError::AmbiguousProjection {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_query_keeps_clause() {
        let err: ExError = QueryError::invalid("join", "alias t is not declared").into();
        assert_eq!(err.kind(), ExErrorKind::InvalidQuery);
        assert_eq!(err.clause(), Some("join"));
        assert_eq!(err.code(), "ERR_INVALID_QUERY");
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::NoUniqueResult)
            .with_op("fetch_one")
            .with_message("Expected exactly one result, found 2");
        let s = err.to_string();
        assert!(s.starts_with("[ERR_NO_UNIQUE_RESULT]"));
        assert!(s.contains("fetch_one"));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;
        let inner = ExError::new(ExErrorKind::StoreUnavailable).with_message("disk I/O error");
        let outer = ExError::new(ExErrorKind::Persistence).with_source(inner);
        assert!(outer.source().is_some());
        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(ExErrorKind::StoreUnavailable)
        );
    }
}
