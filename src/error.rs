use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    /// Error executing a query against the backing store
    #[error("Execution error: {0}")]
    Execution(String),

    /// Error building a query
    #[error("Query error: {0}")]
    Query(String),

    /// A relation kind the join resolver does not know how to walk
    #[error("Unsupported relation: {0}")]
    UnsupportedRelation(String),

    /// A logical column that could not be mapped to a physical one
    #[error("Unresolved column: {0}")]
    UnresolvedColumn(String),

    /// Malformed or incomplete request parameters
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Error rendering a row template or computed-column template
    #[error("Template error: {0}")]
    Template(String),

    /// Error serializing records into row maps
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl GridError {
    /// Whether the failure is a bad request rather than an engine fault.
    ///
    /// Recoverable errors are reported in an otherwise well-formed envelope
    /// with zero records; everything else goes through the configured error
    /// policy at the `make()` boundary.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GridError::BadRequest(_))
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, GridError>;
