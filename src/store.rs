use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use catalog_core::{Catalog, CatalogSnapshot};
use tempfile::NamedTempFile;

use crate::error::{CatalogdError, Result};

/// Persists catalog snapshots as a single YAML file
pub struct SnapshotStore {
    /// Location of the snapshot file
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a new SnapshotStore writing to the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot. A missing file is not an error.
    pub fn load(&self) -> Result<Option<CatalogSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            CatalogdError::Store(format!("Failed to read snapshot {}: {}", self.path.display(), e))
        })?;

        serde_yaml::from_str(&contents).map(Some).map_err(|e| {
            CatalogdError::Store(format!("Failed to parse snapshot {}: {}", self.path.display(), e))
        })
    }

    /// Loads the snapshot and rebuilds a catalog from it
    pub fn load_catalog(&self) -> Result<Option<Catalog>> {
        let Some(snapshot) = self.load()? else {
            return Ok(None);
        };
        Ok(Some(Catalog::from_snapshot(snapshot)?))
    }

    /// Writes the snapshot through a temporary file in the same directory,
    /// so readers never observe a partial file
    pub fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| {
            CatalogdError::Store(format!("Failed to create directory {}: {}", parent.display(), e))
        })?;

        let contents = serde_yaml::to_string(snapshot)
            .map_err(|e| CatalogdError::Store(format!("Failed to serialize snapshot: {}", e)))?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(contents.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| {
            CatalogdError::Store(format!(
                "Failed to write snapshot {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        tracing::info!(
            "Saved snapshot with {} services to {}",
            snapshot.services.len(),
            self.path.display()
        );
        Ok(())
    }
}
