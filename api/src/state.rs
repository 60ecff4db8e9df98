use std::sync::Arc;

use catalog_core::Catalog;

/// Identity of the running catalog, served at `GET /`
#[derive(Debug, Clone)]
pub struct ApiInfo {
    pub name: String,
    pub description: String,
    pub version: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            name: "catalogd".to_string(),
            description: "Service catalog and dependency management".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub info: Arc<ApiInfo>,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog, info: Arc::new(ApiInfo::default()) }
    }

    pub fn with_info(mut self, info: ApiInfo) -> Self {
        self.info = Arc::new(info);
        self
    }
}
