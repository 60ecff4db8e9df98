use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Maximum length of a service id
pub const MAX_ID_LEN: usize = 128;

/// Reported health of a service.
///
/// Variants are declared from least to most severe, so `Ord` compares severity:
/// `Healthy < Unknown < Degraded < Unhealthy`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is fully operational
    Healthy,
    /// No status has been reported yet
    #[default]
    Unknown,
    /// Service works with reduced capacity or elevated latency
    Degraded,
    /// Service is down
    Unhealthy,
}

impl HealthStatus {
    /// Returns the more severe of two statuses, preferring `self` on ties
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        if other > self {
            other
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unknown => "unknown",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => Ok(HealthStatus::Healthy),
            "unknown" => Ok(HealthStatus::Unknown),
            "degraded" => Ok(HealthStatus::Degraded),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            other => Err(CatalogError::InvalidInput(format!("Unknown health status '{}'", other))),
        }
    }
}

/// Payload for registering a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewService {
    /// Unique identifier of the service
    pub id: String,
    /// Human-readable name
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Semantic version of the service
    #[serde(default)]
    pub version: Option<String>,
    /// Initially reported health
    #[serde(default)]
    pub health: HealthStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl NewService {
    /// Creates a registration payload with the required fields only
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Default::default() }
    }

    /// Sets the initially reported health
    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    /// Sets the service version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Checks id, name and version
    pub fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        validate_name(&self.name)?;
        if let Some(version) = &self.version {
            validate_version(version)?;
        }
        Ok(())
    }
}

/// Partial update of a service. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub health: Option<HealthStatus>,
    /// Replaces the whole metadata map when present
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

impl ServicePatch {
    /// Patch that only changes the reported health
    pub fn health(status: HealthStatus) -> Self {
        Self { health: Some(status), ..Default::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(version) = &self.version {
            validate_version(version)?;
        }
        Ok(())
    }
}

/// Represents a service in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Unique identifier of the service
    pub id: String,
    /// Human-readable name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Health as last reported for this service alone
    pub health: HealthStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// When the service was registered
    pub created_at: DateTime<Utc>,
    /// When the service was last updated
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// Creates a new service instance from a registration payload
    pub fn new(new: NewService) -> Self {
        let now = Utc::now();
        Self {
            id: new.id,
            name: new.name,
            description: new.description,
            owner: new.owner,
            version: new.version,
            health: new.health,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a validated patch and bumps the update timestamp
    pub fn apply(&mut self, patch: ServicePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(owner) = patch.owner {
            self.owner = Some(owner);
        }
        if let Some(version) = patch.version {
            self.version = Some(version);
        }
        if let Some(health) = patch.health {
            self.health = health;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
        self.updated_at = Utc::now();
    }

    /// Checks the invariants a stored service must satisfy
    pub fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        validate_name(&self.name)?;
        if let Some(version) = &self.version {
            validate_version(version)?;
        }
        Ok(())
    }
}

/// Validates a service id: 1..=128 ASCII alphanumerics, `-`, `_` or `.`
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(CatalogError::InvalidInput("Service id must not be empty".to_string()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(CatalogError::InvalidInput(format!(
            "Service id '{}' exceeds {} characters",
            id, MAX_ID_LEN
        )));
    }
    if let Some(c) = id.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))) {
        return Err(CatalogError::InvalidInput(format!(
            "Service id '{}' contains invalid character '{}'",
            id, c
        )));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::InvalidInput("Service name must not be blank".to_string()));
    }
    Ok(())
}

fn validate_version(version: &str) -> Result<()> {
    Version::parse(version).map(|_| ()).map_err(|e| {
        CatalogError::InvalidInput(format!("Invalid service version '{}': {}", version, e))
    })
}
