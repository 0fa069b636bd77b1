//! Error types for RelModel operations.

use std::fmt;

/// The primary error type for all RelModel operations.
#[derive(Debug)]
pub enum Error {
    /// Query execution errors reported by the connection
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// Configuration errors
    Config(ConfigError),
    /// Relation declaration or resolution errors
    Relation(RelationError),
    /// A relation failed while being eager-loaded for a batch of parents
    EagerLoad(EagerLoadError),
    /// Operation timed out
    Timeout,
    /// Operation was cancelled via asupersync
    Cancelled,
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Table or column not found
    NotFound,
    /// Permission denied
    Permission,
    /// Statement timeout
    Timeout,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Error raised while declaring, looking up, or resolving a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationError {
    pub kind: RelationErrorKind,
    /// Entity the relation is declared on
    pub owner: String,
    /// Relation (property) name, when known
    pub relation: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationErrorKind {
    /// Descriptor is malformed, or a variant could not be built from it
    InvalidRelationConfig,
    /// No descriptor is registered for the accessed key
    UndeclaredRelation,
    /// The resolved relation does not have the expected shape
    RelationTypeMismatch,
    /// The conventional `set_<key>` mutator is missing
    UndefinedRelationMutator,
    /// The conventional `get_<key>` accessor is missing
    UndefinedRelationAccessor,
}

/// Wraps the first failure of an eager-load batch.
///
/// The underlying error is kept unchanged and exposed through
/// [`std::error::Error::source`].
#[derive(Debug)]
pub struct EagerLoadError {
    pub owner: String,
    pub relation: String,
    pub source: Box<Error>,
}

impl RelationErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RelationErrorKind::InvalidRelationConfig => "invalid relation config",
            RelationErrorKind::UndeclaredRelation => "undeclared relation",
            RelationErrorKind::RelationTypeMismatch => "relation type mismatch",
            RelationErrorKind::UndefinedRelationMutator => "undefined relation mutator",
            RelationErrorKind::UndefinedRelationAccessor => "undefined relation accessor",
        }
    }
}

impl RelationError {
    pub fn new(
        kind: RelationErrorKind,
        owner: impl Into<String>,
        relation: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            owner: owner.into(),
            relation: relation.map(str::to_string),
            message: message.into(),
        }
    }
}

impl Error {
    /// Build an `InvalidRelationConfig` error.
    pub fn invalid_relation(
        owner: impl Into<String>,
        relation: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Error::Relation(RelationError::new(
            RelationErrorKind::InvalidRelationConfig,
            owner,
            relation,
            message,
        ))
    }

    /// Build an `UndeclaredRelation` error.
    pub fn undeclared_relation(owner: impl Into<String>, relation: &str) -> Self {
        let owner = owner.into();
        let message = format!("{owner}::{relation} is not a declared relation");
        Error::Relation(RelationError::new(
            RelationErrorKind::UndeclaredRelation,
            owner,
            Some(relation),
            message,
        ))
    }

    /// Build a `RelationTypeMismatch` error.
    pub fn relation_type_mismatch(
        owner: impl Into<String>,
        relation: &str,
        message: impl Into<String>,
    ) -> Self {
        Error::Relation(RelationError::new(
            RelationErrorKind::RelationTypeMismatch,
            owner,
            Some(relation),
            message,
        ))
    }

    /// The relation error kind, if this is a relation error.
    ///
    /// Eager-load wrappers are looked through.
    pub fn relation_kind(&self) -> Option<RelationErrorKind> {
        match self {
            Error::Relation(e) => Some(e.kind),
            Error::EagerLoad(e) => e.source.relation_kind(),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            Error::EagerLoad(e) => e.source.sql(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Relation(e) => write!(f, "Relation error ({}): {}", e.kind.as_str(), e.message),
            Error::EagerLoad(e) => write!(
                f,
                "Eager loading {}::{} failed: {}",
                e.owner, e.relation, e.source
            ),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::EagerLoad(e) => Some(e.source.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for RelationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<RelationError> for Error {
    fn from(err: RelationError) -> Self {
        Error::Relation(err)
    }
}

impl From<EagerLoadError> for Error {
    fn from(err: EagerLoadError) -> Self {
        Error::EagerLoad(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for RelModel operations.
pub type Result<T> = std::result::Result<T, Error>;
