use catalog_core::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogdError {
    /// Error during file system operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error in the process configuration
    #[error("Configuration error: {0}")]
    Config(String),
    /// Error reading or writing YAML
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Error reading or writing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Error while generating or compiling a schema
    #[error("Schema compilation error: {0}")]
    SchemaCompilation(String),
    /// Document does not match its schema
    #[error("Schema validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    /// Document schema version cannot be read by this build
    #[error("Incompatible schema version: {0}")]
    IncompatibleVersion(String),
    /// Error during snapshot persistence
    #[error("Snapshot store error: {0}")]
    Store(String),
    /// Error raised by the catalog itself
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, CatalogdError>;
