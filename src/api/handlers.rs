use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::ApiState;
use crate::discovery::SiteEntry;
use crate::manifest::Manifest;

#[derive(Serialize)]
pub struct SitesResponse {
    pub sites: Vec<SiteEntry>,
}

#[derive(Serialize)]
pub struct ContentResponse {
    pub content: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StatusResponse {
    fn new(status: &'static str) -> Json<Self> {
        Json(Self { status, path: None })
    }
}

#[derive(Deserialize)]
pub struct SaveSiteRequest {
    pub name: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct SslRequest {
    pub domain: String,
}

pub async fn list_sites(State(state): State<ApiState>) -> Json<SitesResponse> {
    Json(SitesResponse {
        sites: state.enumerator.list_all().await,
    })
}

pub async fn get_site(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<ContentResponse>, ApiError> {
    let content = state.store.get(&name)?;
    Ok(Json(ContentResponse { content }))
}

pub async fn save_site(
    State(state): State<ApiState>,
    ApiJson(req): ApiJson<SaveSiteRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.save(&req.name, &req.content)?;
    state
        .store
        .apply()
        .await
        .map_err(|e| ApiError::from(e).context("saved, not activated"))?;
    Ok(StatusResponse::new("saved"))
}

pub async fn toggle_site(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    ApiJson(req): ApiJson<ToggleRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.set_enabled(&name, req.enabled)?;
    state
        .store
        .apply()
        .await
        .map_err(|e| ApiError::from(e).context("toggled, not activated"))?;
    Ok(StatusResponse::new(if req.enabled { "enabled" } else { "disabled" }))
}

pub async fn archive_site(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.archive(&name)?;
    state
        .store
        .reload()
        .await
        .map_err(|e| ApiError::from(e).context("archived, reload failed"))?;
    Ok(StatusResponse::new("archived"))
}

pub async fn restore_site(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.restore(&name)?;
    Ok(StatusResponse::new("restored"))
}

pub async fn create_app(
    State(state): State<ApiState>,
    ApiJson(manifest): ApiJson<Manifest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let path = state.sync.create_manifest(&manifest)?;
    Ok(Json(StatusResponse {
        status: "manifest created",
        path: Some(path),
    }))
}

pub async fn issue_ssl(
    State(state): State<ApiState>,
    ApiJson(req): ApiJson<SslRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.issue_certificate(&req.domain).await?;
    Ok(StatusResponse::new("certificate installed"))
}

pub async fn health() -> Json<StatusResponse> {
    StatusResponse::new("ok")
}
