//! Admin-only handlers: settings and log inspection.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use crate::audit;
use crate::auth::require_admin;
use crate::errors::ApiError;
use crate::handlers::envelope;
use crate::store::records::FileStore;
use crate::AppState;

/// Pagination for the log endpoints.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

/// `GET /api/admin/settings` -- the full settings table.
pub async fn get_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&headers, &state.config.auth.jwt_secret)?;

    let settings = state.store.get_settings().await?;
    Ok(Json(envelope("Settings retrieved successfully.", json!(settings))).into_response())
}

/// `PUT /api/admin/settings` -- upsert settings from a key/value map.
///
/// Values take effect on the next admission decision; there is no
/// policy cache to invalidate.
pub async fn put_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let identity = require_admin(&headers, &state.config.auth.jwt_secret)?;

    if body.is_empty() {
        return Err(ApiError::Validation("No settings provided.".to_string()));
    }

    for (key, value) in &body {
        state.store.put_setting(key, value).await?;
    }

    state
        .audit
        .record(
            Some(identity.id),
            audit::UPDATE_SETTINGS,
            json!({"keys": body.keys().collect::<Vec<_>>()}),
        )
        .await;

    let settings = state.store.get_settings().await?;
    Ok(Json(envelope("Settings updated successfully.", json!(settings))).into_response())
}

/// `GET /api/admin/logs` -- audit trail, newest first.
pub async fn list_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<Pagination>,
) -> Result<Response, ApiError> {
    require_admin(&headers, &state.config.auth.jwt_secret)?;

    let entries = state.store.list_audit(page.limit, page.offset).await?;
    Ok(Json(envelope("Logs retrieved successfully.", json!(entries))).into_response())
}

/// `GET /api/admin/file-access-logs` -- download history, newest first.
pub async fn list_access_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<Pagination>,
) -> Result<Response, ApiError> {
    require_admin(&headers, &state.config.auth.jwt_secret)?;

    let entries = state.store.list_access_logs(page.limit, page.offset).await?;
    Ok(Json(envelope("Access logs retrieved successfully.", json!(entries))).into_response())
}
