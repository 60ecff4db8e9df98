use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use catalog_core::Catalog;
use jsonschema::JSONSchema;
use schemars::schema_for;
use semver::Version;

use crate::error::{CatalogdError as Error, Result};
use crate::schema::document::CatalogDocument;

/// Current schema version used by the system
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// Key under which document-level warnings are reported
pub const DOCUMENT_WARNING_KEY: &str = "document";

/// Result of version compatibility check
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum VersionCompatibility {
    /// Versions are compatible
    Compatible,
    /// Minor incompatibility (forward-compatible)
    MinorIncompatible,
    /// Major incompatibility (breaking changes)
    MajorIncompatible,
}

/// Checks compatibility between versions
pub fn check_version_compatibility(version: &str, current: &str) -> VersionCompatibility {
    let (Ok(v1), Ok(v2)) = (Version::parse(version), Version::parse(current)) else {
        return VersionCompatibility::MajorIncompatible;
    };

    if v1.major != v2.major {
        VersionCompatibility::MajorIncompatible
    } else if v1.minor != v2.minor {
        VersionCompatibility::MinorIncompatible
    } else {
        VersionCompatibility::Compatible
    }
}

/// A compiled JSON schema validator
#[derive(Clone)]
pub struct CompiledSchema {
    schema: Arc<JSONSchema>,
}

impl CompiledSchema {
    /// Creates a new compiled schema
    pub fn new(schema: JSONSchema) -> Self {
        Self { schema: Arc::new(schema) }
    }

    /// Validates a value against the schema
    pub fn validate(&self, value: &serde_json::Value) -> std::result::Result<(), Vec<String>> {
        self.schema.validate(value).map_err(|errors| {
            errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect()
        })
    }
}

/// Summary of catalog document validation results
#[derive(Debug, Clone)]
pub struct ValidationSummary {
    /// Ids of services that validated successfully
    pub successful: Vec<String>,
    /// Service ids and error messages that failed validation
    pub failed: Vec<(String, String)>,
    /// Warnings generated during validation, keyed by service id
    pub warnings: BTreeMap<String, Vec<String>>,
    /// Validation timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Default for ValidationSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationSummary {
    /// Creates a new validation summary
    pub fn new() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
            warnings: BTreeMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn successful_count(&self) -> usize {
        self.successful.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Gets the number of warnings across all services
    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(|w| w.len()).sum()
    }

    pub fn total_count(&self) -> usize {
        self.successful_count() + self.failed_count()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if all validations were successful (no failures)
    pub fn is_successful(&self) -> bool {
        self.failed.is_empty()
    }

    /// Adds a warning for a service
    pub fn add_warning(&mut self, service_id: impl Into<String>, warning: String) {
        self.warnings.entry(service_id.into()).or_default().push(warning);
    }
}

/// Validates catalog documents against the generated schema
#[derive(Default)]
pub struct ValidationService {
    schema_cache: Option<CompiledSchema>,
}

impl ValidationService {
    /// Creates a new validation service
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets or compiles the catalog document schema
    pub fn get_or_compile_schema(&mut self) -> Result<&CompiledSchema> {
        if self.schema_cache.is_none() {
            self.schema_cache = Some(self.compile_schema()?);
        }
        self.schema_cache
            .as_ref()
            .ok_or_else(|| Error::SchemaCompilation("Schema cache is empty".to_string()))
    }

    /// Compiles the catalog document schema
    pub fn compile_schema(&self) -> Result<CompiledSchema> {
        let schema_value = serde_json::to_value(schema_for!(CatalogDocument))
            .map_err(|e| Error::SchemaCompilation(format!("Failed to generate schema: {}", e)))?;

        let schema = JSONSchema::compile(&schema_value)
            .map_err(|e| Error::SchemaCompilation(format!("Failed to compile schema: {}", e)))?;

        Ok(CompiledSchema::new(schema))
    }

    /// Checks the schema version and the schema of a raw document, then parses it.
    /// Returns document-level warnings alongside the document.
    pub fn parse_document(
        &mut self,
        value: serde_json::Value,
    ) -> Result<(CatalogDocument, Vec<String>)> {
        let mut warnings = Vec::new();

        let version = value
            .get("schema_version")
            .and_then(|v| v.as_str())
            .unwrap_or(CURRENT_SCHEMA_VERSION)
            .to_string();

        match check_version_compatibility(&version, CURRENT_SCHEMA_VERSION) {
            VersionCompatibility::Compatible => {}
            VersionCompatibility::MinorIncompatible => {
                tracing::warn!(
                    "Minor schema version incompatibility: document version {} vs current {}",
                    version,
                    CURRENT_SCHEMA_VERSION
                );
                warnings.push(format!(
                    "Document uses schema version {} which differs from the current version {}",
                    version, CURRENT_SCHEMA_VERSION
                ));
            }
            VersionCompatibility::MajorIncompatible => {
                return Err(Error::IncompatibleVersion(format!(
                    "Schema version {} is incompatible with current version {}",
                    version, CURRENT_SCHEMA_VERSION
                )));
            }
        }

        self.get_or_compile_schema()?.validate(&value).map_err(Error::Validation)?;

        let document = serde_json::from_value(value)?;
        Ok((document, warnings))
    }

    /// Validates every service of a document, collecting all failures
    /// instead of stopping at the first one
    pub fn validate_document(&mut self, value: serde_json::Value) -> Result<ValidationSummary> {
        let (document, warnings) = self.parse_document(value)?;

        let mut summary = ValidationSummary::new();
        for warning in warnings {
            summary.add_warning(DOCUMENT_WARNING_KEY, warning);
        }

        // Registration first, so dependency order in the document does not matter
        let scratch = Catalog::new();
        let mut rejected: HashSet<usize> = HashSet::new();
        for (index, definition) in document.services.iter().enumerate() {
            if let Err(err) = scratch.register_service(definition.to_new_service()) {
                summary.failed.push((definition.id.clone(), err.to_string()));
                rejected.insert(index);
            }
        }

        for (index, definition) in document.services.iter().enumerate() {
            if rejected.contains(&index) {
                continue;
            }

            let mut seen = HashSet::new();
            let mut error = None;
            for dependency in &definition.dependencies {
                if !seen.insert(dependency.as_str()) {
                    summary.add_warning(
                        definition.id.clone(),
                        format!("Dependency '{}' is listed more than once", dependency),
                    );
                    continue;
                }
                if let Err(err) = scratch.add_dependency(&definition.id, dependency) {
                    error.get_or_insert(err.to_string());
                }
            }

            match error {
                Some(message) => summary.failed.push((definition.id.clone(), message)),
                None => summary.successful.push(definition.id.clone()),
            }
        }

        Ok(summary)
    }

    /// Reads a YAML or JSON document from disk and validates it
    pub fn validate_file(&mut self, path: &Path) -> Result<ValidationSummary> {
        let value = read_document_value(path)?;
        self.validate_document(value)
    }

    /// Reads a document from disk and builds a catalog from it
    pub fn load_catalog(&mut self, path: &Path) -> Result<Catalog> {
        let (document, warnings) = self.parse_document(read_document_value(path)?)?;
        for warning in warnings {
            tracing::warn!("{}: {}", path.display(), warning);
        }

        let catalog = document.to_catalog()?;
        tracing::info!("Loaded {} services from {}", document.services.len(), path.display());
        Ok(catalog)
    }
}

/// YAML is a superset of JSON, so both formats parse through serde_yaml
fn read_document_value(path: &Path) -> Result<serde_json::Value> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}
