use thiserror::Error;

/// Errors raised by catalog operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The referenced service is not registered
    #[error("Service '{0}' not found")]
    NotFound(String),
    /// A service with the same id is already registered
    #[error("Service '{0}' already exists")]
    DuplicateId(String),
    /// The service is still depended upon and cannot be removed
    #[error("Service '{id}' is a dependency of: {}", dependents.join(", "))]
    Conflict { id: String, dependents: Vec<String> },
    /// Adding the edge would close a cycle; `path` runs from `from` back to itself
    #[error("Adding dependency '{from}' -> '{to}' would create a cycle: {}", path.join(" -> "))]
    CycleDetected { from: String, to: String, path: Vec<String> },
    /// Malformed id, name, version or patch
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CatalogError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "not_found",
            CatalogError::DuplicateId(_) => "duplicate_id",
            CatalogError::Conflict { .. } => "conflict",
            CatalogError::CycleDetected { .. } => "cycle_detected",
            CatalogError::InvalidInput(_) => "invalid_input",
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
