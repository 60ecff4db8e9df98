pub mod document;
pub mod validation;

pub use document::{CatalogDocument, ServiceDefinition};
pub use validation::{
    check_version_compatibility, CompiledSchema, ValidationService, ValidationSummary,
    VersionCompatibility, CURRENT_SCHEMA_VERSION,
};
