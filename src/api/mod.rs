//! Admin JSON API over the reconciliation engine.
//!
//! Save and toggle run validate then reload, archive only reloads, restore
//! leaves nginx alone. A failed validate or reload is reported to the caller
//! and the filesystem change stays in place.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::discovery::SiteEnumerator;
use crate::manifest::ManifestSync;
use crate::store::ConfigStore;

use self::auth::require_api_key;
use self::handlers::*;

/// Shared state injected into handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: ConfigStore,
    pub enumerator: SiteEnumerator,
    pub sync: ManifestSync,
    pub api_key: Option<Arc<str>>,
}

impl ApiState {
    pub fn new(sync: ManifestSync, enumerator: SiteEnumerator, api_key: Option<&str>) -> Self {
        Self {
            store: enumerator.store().clone(),
            enumerator,
            sync,
            api_key: api_key.map(Arc::from),
        }
    }
}

/// `/api/*` routes with auth, request IDs and tracing.
pub fn router(state: ApiState) -> Router {
    let api = Router::new()
        .route("/sites", get(list_sites).post(save_site))
        .route("/sites/{name}", get(get_site))
        .route("/sites/{name}/toggle", post(toggle_site))
        .route("/sites/{name}/archive", post(archive_site))
        .route("/sites/{name}/restore", post(restore_site))
        .route("/apps", post(create_app))
        .route("/ssl", post(issue_ssl))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .route("/health", get(health))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
