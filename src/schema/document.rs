use std::collections::BTreeMap;

use catalog_core::{Catalog, HealthStatus, NewService};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::validation::CURRENT_SCHEMA_VERSION;

/// A catalog described on disk: services and the dependencies between them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CatalogDocument {
    /// Version of this document format
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Services in the catalog
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
}

/// Definition of a single service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ServiceDefinition {
    /// Unique identifier of the service
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Description of the service
    pub description: Option<String>,
    /// Owner of the service
    pub owner: Option<String>,
    /// Semantic version of the service
    pub version: Option<String>,
    /// Initially reported health
    #[serde(default)]
    pub health: HealthStatus,
    /// Extensible metadata for additional attributes
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Ids of the services this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn default_schema_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

impl ServiceDefinition {
    pub fn to_new_service(&self) -> NewService {
        NewService {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            owner: self.owner.clone(),
            version: self.version.clone(),
            health: self.health,
            metadata: self.metadata.clone(),
        }
    }
}

impl CatalogDocument {
    /// Builds a catalog, stopping at the first registration or dependency error
    pub fn to_catalog(&self) -> Result<Catalog> {
        let catalog = Catalog::new();
        for definition in &self.services {
            catalog.register_service(definition.to_new_service())?;
        }
        for definition in &self.services {
            for dependency in &definition.dependencies {
                catalog.add_dependency(&definition.id, dependency)?;
            }
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use catalog_core::CatalogError;
    use jsonschema::JSONSchema;
    use schemars::schema_for;
    use serde_json::json;

    use super::*;
    use crate::error::CatalogdError;

    fn document(value: serde_json::Value) -> CatalogDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_document_schema() {
        let schema = serde_json::to_value(schema_for!(CatalogDocument)).unwrap();
        let validator = JSONSchema::compile(&schema).unwrap();

        let config = json!({
            "schema_version": "1.0.0",
            "services": [
                {
                    "id": "auth",
                    "name": "Auth Service",
                    "owner": "Platform Team",
                    "version": "1.4.0",
                    "health": "healthy",
                    "dependencies": ["users"],
                    "metadata": { "tier": 1, "tags": ["identity"] }
                },
                { "id": "users", "name": "User Service" }
            ]
        });

        assert!(validator.is_valid(&config), "Validation failed");
    }

    #[test]
    fn test_invalid_document_schema() {
        let schema = serde_json::to_value(schema_for!(CatalogDocument)).unwrap();
        let validator = JSONSchema::compile(&schema).unwrap();

        // Missing name, bad health value and an unknown field
        let config = json!({
            "services": [
                { "id": "auth", "health": "sideways", "team": "x" }
            ]
        });

        assert!(!validator.is_valid(&config), "Expected validation to fail");
    }

    #[test]
    fn test_to_catalog() {
        let doc = document(json!({
            "services": [
                { "id": "web", "name": "Web", "health": "healthy", "dependencies": ["api"] },
                { "id": "api", "name": "API", "health": "degraded" }
            ]
        }));

        let catalog = doc.to_catalog().unwrap();
        assert_eq!(catalog.dependencies("web").unwrap(), vec!["api"]);
        assert_eq!(catalog.effective_health("web").unwrap(), HealthStatus::Degraded);
        assert_eq!(doc.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_to_catalog_missing_dependency() {
        let doc = document(json!({
            "services": [{ "id": "web", "name": "Web", "dependencies": ["api"] }]
        }));

        let err = doc.to_catalog().unwrap_err();
        assert!(matches!(err, CatalogdError::Catalog(CatalogError::NotFound(ref id)) if id == "api"));
    }
}
