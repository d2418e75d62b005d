//! File lifecycle handlers: upload, download, detail, edit, delete,
//! listing, stats, and password verification.

use axum::extract::{ConnectInfo, Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use subtle::ConstantTimeEq;

use crate::admission::{admit, UploadOptions};
use crate::audit;
use crate::auth::{optional_identity, require_identity};
use crate::authz::{authorize, may_mutate, Deny, Operation};
use crate::errors::ApiError;
use crate::handlers::{client_ip, envelope, file_view};
use crate::metrics::{ACCESS_DENIED_TOTAL, DOWNLOADS_TOTAL, UPLOADS_TOTAL};
use crate::settings::UploadPolicy;
use crate::storage::backend::BlobStore;
use crate::store::records::{DeleteOutcome, FileStore, FileUpdate};
use crate::AppState;

/// Header carrying the file password for protected downloads.
const PASSWORD_HEADER: &str = "x-file-password";

fn supplied_password(headers: &HeaderMap) -> Option<&str> {
    headers.get(PASSWORD_HEADER).and_then(|v| v.to_str().ok())
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::Validation("Invalid expiration date.".to_string()))
}

fn deny_label(deny: &Deny) -> &'static str {
    match deny {
        Deny::PrivateAuthRequired | Deny::NotAuthorized => "private",
        Deny::InvalidPassword => "password",
        Deny::Expired => "expired",
        Deny::LimitReached => "limit",
    }
}

// -- Upload -------------------------------------------------------------------

/// `POST /api/files/upload` -- multipart upload.
///
/// Fields: `file` (required), `expiresAt`, `password`, `isPrivate`,
/// `accessLimit`.  Anonymous uploads are accepted with the reduced
/// policy; the admission controller strips the options they may not
/// use.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let requester = optional_identity(&headers, &state.config.auth.jwt_secret);

    let mut data: Option<(String, Bytes)> = None;
    let mut options = UploadOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| ApiError::Validation("No file uploaded.".to_string()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Malformed upload: {e}")))?;
                data = Some((file_name, bytes));
            }
            "expiresAt" => {
                let raw = field.text().await.unwrap_or_default();
                if !raw.is_empty() {
                    options.expires_at = Some(parse_expiry(&raw)?);
                }
            }
            "password" => {
                let raw = field.text().await.unwrap_or_default();
                if !raw.is_empty() {
                    options.password = Some(raw);
                }
            }
            "isPrivate" => {
                let raw = field.text().await.unwrap_or_default();
                options.is_private = matches!(raw.as_str(), "true" | "1");
            }
            "accessLimit" => {
                let raw = field.text().await.unwrap_or_default();
                if !raw.is_empty() {
                    let limit: u32 = raw
                        .parse()
                        .map_err(|_| ApiError::Validation("Invalid access limit.".to_string()))?;
                    options.access_limit = Some(limit);
                }
            }
            _ => {}
        }
    }

    let (display_name, bytes) = data.ok_or_else(|| {
        ApiError::Validation("No file uploaded.".to_string())
    })?;

    let policy = UploadPolicy::from_map(&state.store.get_settings().await?);
    let record = admit(
        requester,
        &display_name,
        bytes.len() as u64,
        options,
        &policy,
        Utc::now(),
    )?;

    // Blob first, record second: a visible record always has a durable
    // blob behind it.
    state.storage.put(&record.storage_key, bytes).await?;
    state.store.insert_file(record.clone()).await?;

    counter!(UPLOADS_TOTAL).increment(1);
    state
        .audit
        .record(
            record.owner_id,
            audit::UPLOAD_FILE,
            json!({"fileId": record.id, "fileName": record.display_name, "size": record.size}),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(envelope("File uploaded successfully.", file_view(&record))),
    )
        .into_response())
}

// -- Download -----------------------------------------------------------------

/// `GET /api/files/download/:id` -- serve the blob.
///
/// A successful download performs its access-log append, conditional
/// counter increment, and audit event exactly once; when the
/// conditional increment loses a quota race no side effect survives.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Result<Response, ApiError> {
    let requester = optional_identity(&headers, &state.config.auth.jwt_secret);
    let user_id = requester.map(|r| r.id);
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));

    let record = state
        .store
        .get_file(&id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if let Err(deny) = authorize(
        &record,
        requester.as_ref(),
        supplied_password(&headers),
        Operation::Download,
        Utc::now(),
    ) {
        counter!(ACCESS_DENIED_TOTAL, "reason" => deny_label(&deny)).increment(1);
        state
            .audit
            .record(
                user_id,
                audit::DOWNLOAD_ATTEMPT_FAILED,
                json!({"fileId": record.id, "reason": deny_label(&deny)}),
            )
            .await;
        return Err(deny.into());
    }

    if !state.storage.exists(&record.storage_key).await? {
        return Err(ApiError::NotFoundOnServer);
    }

    // The conditional increment is the authoritative quota check; the
    // authorization pass above can lose a race against a concurrent
    // download.
    if !state.store.record_download(&record.id, user_id, &ip).await? {
        counter!(ACCESS_DENIED_TOTAL, "reason" => "limit").increment(1);
        state
            .audit
            .record(
                user_id,
                audit::DOWNLOAD_ATTEMPT_FAILED,
                json!({"fileId": record.id, "reason": "limit"}),
            )
            .await;
        return Err(ApiError::LimitReached);
    }

    let blob = state.storage.get(&record.storage_key).await?;

    counter!(DOWNLOADS_TOTAL).increment(1);
    state
        .audit
        .record(
            user_id,
            audit::DOWNLOAD_FILE,
            json!({"fileId": record.id, "fileName": record.display_name}),
        )
        .await;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        record.display_name.replace(['"', '\\'], "_")
    );
    let last_modified = httpdate::fmt_http_date(std::time::SystemTime::from(record.created_at));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::LAST_MODIFIED, last_modified),
        ],
        blob.data,
    )
        .into_response())
}

// -- Detail -------------------------------------------------------------------

/// `GET /api/files/:id` -- sanitized metadata view.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let requester = optional_identity(&headers, &state.config.auth.jwt_secret);

    let record = state
        .store
        .get_file(&id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if let Err(deny) = authorize(
        &record,
        requester.as_ref(),
        supplied_password(&headers),
        Operation::View,
        Utc::now(),
    ) {
        counter!(ACCESS_DENIED_TOTAL, "reason" => deny_label(&deny)).increment(1);
        return Err(deny.into());
    }

    Ok(Json(envelope("File retrieved successfully.", file_view(&record))).into_response())
}

// -- Edit ---------------------------------------------------------------------

/// Body of `PATCH /api/files/:id`.  Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub password: Option<String>,
    pub expires_at: Option<String>,
    pub access_limit: Option<u32>,
    pub is_private: Option<bool>,
}

/// `PATCH /api/files/:id` -- update access options.  Owner or admin only.
pub async fn edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<EditRequest>,
) -> Result<Response, ApiError> {
    let identity = require_identity(&headers, &state.config.auth.jwt_secret)?;

    let record = state
        .store
        .get_file(&id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !may_mutate(&record, &identity) {
        return Err(ApiError::Forbidden(
            "You are not authorized to edit this file.".to_string(),
        ));
    }

    let update = FileUpdate {
        password: body.password,
        expires_at: body.expires_at.as_deref().map(parse_expiry).transpose()?,
        // Zero means unlimited, same as on upload.
        access_limit: body.access_limit.filter(|&limit| limit > 0),
        is_private: body.is_private,
    };

    let updated = state
        .store
        .update_file(&record.id, update)
        .await?
        .ok_or(ApiError::NotFound)?;

    state
        .audit
        .record(
            Some(identity.id),
            audit::EDIT_FILE,
            json!({
                "fileId": updated.id,
                "previous": file_view(&record),
                "updated": file_view(&updated),
            }),
        )
        .await;

    Ok(Json(envelope("File updated successfully.", file_view(&updated))).into_response())
}

// -- Delete -------------------------------------------------------------------

/// `DELETE /api/files/:id` -- remove the blob and retire the record.
///
/// The blob always goes.  The record row goes too unless access-log
/// history references it, in which case the store tombstones it and
/// the response says so.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let identity = require_identity(&headers, &state.config.auth.jwt_secret)?;

    let record = state
        .store
        .get_file(&id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !may_mutate(&record, &identity) {
        return Err(ApiError::Forbidden(
            "You are not authorized to delete this file.".to_string(),
        ));
    }

    state.storage.delete(&record.storage_key).await?;
    let outcome = state.store.delete_file(&record.id).await?;

    let (action, message) = match outcome {
        DeleteOutcome::Deleted => (audit::DELETE_FILE, "File deleted successfully."),
        DeleteOutcome::Tombstoned => (
            audit::DELETE_FILE_SOFT,
            "File marked as deleted due to constraints.",
        ),
    };

    state
        .audit
        .record(Some(identity.id), action, json!({"fileId": record.id}))
        .await;

    Ok(Json(envelope(message, json!(null))).into_response())
}

// -- Listing and stats --------------------------------------------------------

/// `GET /api/files` -- the requester's own files, newest first.
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let identity = require_identity(&headers, &state.config.auth.jwt_secret)?;

    let records = state.store.files_by_owner(identity.id).await?;
    let views: Vec<_> = records.iter().map(file_view).collect();

    Ok(Json(envelope("Files retrieved successfully.", json!(views))).into_response())
}

/// `GET /api/files/stats` -- aggregate usage for the requester.
pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let identity = require_identity(&headers, &state.config.auth.jwt_secret)?;

    let records = state.store.files_by_owner(identity.id).await?;
    let total_files = records.len();
    let total_space: u64 = records.iter().map(|r| r.size).sum();
    let total_downloads: u64 = records.iter().map(|r| u64::from(r.downloads)).sum();

    Ok(Json(envelope(
        "Stats retrieved successfully.",
        json!({
            "totalFiles": total_files,
            "totalSpaceUsed": total_space,
            "totalDownloads": total_downloads,
        }),
    ))
    .into_response())
}

// -- Password verification ----------------------------------------------------

/// Body of `POST /api/files/verify-password`.  Both fields are kept
/// optional at the serde level so an incomplete body gets the standard
/// 400 envelope instead of a bare extractor rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordRequest {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// `POST /api/files/verify-password` -- check a password before a
/// client commits to a download.
pub async fn verify_password(
    State(state): State<AppState>,
    Json(body): Json<VerifyPasswordRequest>,
) -> Result<Response, ApiError> {
    let (file_id, password) = match (body.file_id, body.password) {
        (Some(file_id), Some(password)) if !file_id.is_empty() && !password.is_empty() => {
            (file_id, password)
        }
        _ => {
            return Err(ApiError::Validation(
                "File ID and password are required.".to_string(),
            ))
        }
    };

    let record = state
        .store
        .get_file(&file_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let stored = record.password.as_deref().ok_or_else(|| {
        ApiError::Validation("This file is not password protected.".to_string())
    })?;

    let matches: bool = stored.as_bytes().ct_eq(password.as_bytes()).into();
    if !matches {
        return Err(ApiError::InvalidPassword);
    }

    Ok(Json(envelope("Password verified.", file_view(&record))).into_response())
}
