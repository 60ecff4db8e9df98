//! Route handlers. Each one maps onto a single catalog operation.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use catalog_core::{HealthReport, HealthStatus, NewService, Service, ServicePatch};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

/// Body of `POST /services/:id/dependencies`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddDependencyRequest {
    pub dependency: String,
}

/// Body of `PUT /services/:id/health`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportHealthRequest {
    pub status: HealthStatus,
}

/// A service together with a list of related service ids
#[derive(Debug, Serialize, Deserialize)]
pub struct RelatedServices {
    pub service: String,
    pub services: Vec<String>,
}

/// Returns basic information about the catalog
pub async fn get_info(State(state): State<AppState>) -> Json<Value> {
    let stats = state.catalog.stats();
    Json(json!({
        "name": state.info.name,
        "description": state.info.description,
        "version": state.info.version,
        "status": "operational",
        "services": stats.services,
        "dependencies": stats.dependencies,
    }))
}

pub async fn list_services(State(state): State<AppState>) -> Json<Vec<Service>> {
    Json(state.catalog.list_services())
}

pub async fn create_service(
    State(state): State<AppState>,
    payload: Result<Json<NewService>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Service>)> {
    let Json(new) = payload?;
    let service = state.catalog.register_service(new)?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Service>> {
    Ok(Json(state.catalog.get_service(&id)?))
}

pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ServicePatch>, JsonRejection>,
) -> ApiResult<Json<Service>> {
    let Json(patch) = payload?;
    Ok(Json(state.catalog.update_service(&id, patch)?))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.catalog.delete_service(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_dependencies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RelatedServices>> {
    let services = state.catalog.dependencies(&id)?;
    Ok(Json(RelatedServices { service: id, services }))
}

pub async fn add_dependency(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AddDependencyRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RelatedServices>)> {
    let Json(request) = payload?;
    let (created, services) = state.catalog.add_dependency_listing(&id, &request.dependency)?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(RelatedServices { service: id, services })))
}

/// Always succeeds; removing a missing edge is a no-op
pub async fn remove_dependency(
    State(state): State<AppState>,
    Path((id, dependency)): Path<(String, String)>,
) -> StatusCode {
    state.catalog.remove_dependency(&id, &dependency);
    StatusCode::NO_CONTENT
}

pub async fn list_dependents(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RelatedServices>> {
    let services = state.catalog.dependents(&id)?;
    Ok(Json(RelatedServices { service: id, services }))
}

pub async fn get_impact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RelatedServices>> {
    let services = state.catalog.impacted_services(&id)?;
    Ok(Json(RelatedServices { service: id, services }))
}

pub async fn get_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<HealthReport>> {
    Ok(Json(state.catalog.health_report(&id)?))
}

pub async fn report_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ReportHealthRequest>, JsonRejection>,
) -> ApiResult<Json<HealthReport>> {
    let Json(request) = payload?;
    state.catalog.report_health(&id, request.status)?;
    Ok(Json(state.catalog.health_report(&id)?))
}
