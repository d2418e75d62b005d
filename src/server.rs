//! Router assembly and shutdown handling.

use axum::extract::DefaultBodyLimit;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, files};
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

/// `GET /health` -- liveness probe.
async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Build the application router.
///
/// Upload size policy lives in the admission controller, so the
/// framework's default body limit is disabled rather than duplicated.
pub fn router(state: AppState) -> Router {
    let metrics_enabled = state.config.observability.metrics;

    let mut app = Router::new()
        .route("/api/files/upload", post(files::upload))
        .route("/api/files", get(files::list))
        .route("/api/files/stats", get(files::stats))
        .route("/api/files/verify-password", post(files::verify_password))
        .route("/api/files/download/:id", get(files::download))
        .route(
            "/api/files/:id",
            get(files::detail)
                .patch(files::edit)
                .delete(files::delete),
        )
        .route(
            "/api/admin/settings",
            get(admin::get_settings).put(admin::put_settings),
        )
        .route("/api/admin/logs", get(admin::list_logs))
        .route("/api/admin/file-access-logs", get(admin::list_access_logs))
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    if metrics_enabled {
        app = app
            .route("/metrics", get(metrics_handler))
            .layer(middleware::from_fn(metrics_middleware));
    }

    app
}

/// Resolves when the process receives SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{issue_token, Identity};
    use crate::config::Config;
    use crate::storage::backend::BlobStore;
    use crate::storage::local::LocalBlobStore;
    use crate::store::records::{
        generate_file_id, generate_storage_key, FileRecord, FileStore,
    };
    use crate::store::sqlite::SqliteFileStore;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use bytes::Bytes;
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "sharebox-dev-secret";

    struct TestApp {
        _dir: tempfile::TempDir,
        store: Arc<SqliteFileStore>,
        storage: Arc<LocalBlobStore>,
        router: Router,
    }

    fn test_app() -> TestApp {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store =
            Arc::new(SqliteFileStore::new(":memory:").expect("failed to open in-memory store"));
        store.seed_settings().expect("failed to seed settings");
        let storage =
            Arc::new(LocalBlobStore::new(dir.path()).expect("failed to create blob store"));

        let mut config = Config::default();
        // Keep the metrics layer out of router tests; the global
        // recorder is process-wide state.
        config.observability.metrics = false;

        let state = AppState::new(config, store.clone(), storage.clone());
        TestApp {
            _dir: dir,
            store,
            storage,
            router: router(state),
        }
    }

    fn token(id: i64, is_admin: bool) -> String {
        issue_token(Identity { id, is_admin }, SECRET, 3600)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed_file(app: &TestApp, record: &FileRecord, content: &'static str) {
        app.storage
            .put(&record.storage_key, Bytes::from(content))
            .await
            .unwrap();
        app.store.insert_file(record.clone()).await.unwrap();
    }

    fn sample_record(owner_id: Option<i64>) -> FileRecord {
        FileRecord {
            id: generate_file_id(),
            owner_id,
            storage_key: generate_storage_key(),
            display_name: "notes.txt".into(),
            is_private: false,
            password: None,
            expires_at: None,
            access_limit: None,
            downloads: 0,
            size: 5,
            created_at: Utc::now(),
        }
    }

    const BOUNDARY: &str = "XBOUNDARYX";

    fn multipart_upload(file_name: &str, content: &str, fields: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        ));
        Request::builder()
            .method("POST")
            .uri("/api/files/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let response = app
            .router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_anonymous_upload_gets_bounded_expiry() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(multipart_upload("hello.txt", "hello", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let record = app.store.get_file(&id).await.unwrap().unwrap();
        assert_eq!(record.owner_id, None);
        // Seeded anonymous bound is 24 hours.
        let expires = record.expires_at.unwrap();
        let hours = (expires - Utc::now()).num_hours();
        assert!((23..=24).contains(&hours), "unexpected bound: {hours}h");
        // The blob landed under the opaque key.
        assert!(app.storage.exists(&record.storage_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_anonymous_upload_strips_privacy_options() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(multipart_upload(
                "secret.txt",
                "x",
                &[
                    ("isPrivate", "true"),
                    ("password", "hunter2"),
                    ("accessLimit", "3"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["data"]["isPrivate"], false);
        assert_eq!(body["data"]["passwordProtected"], false);
        assert_eq!(body["data"]["accessLimit"], Value::Null);
    }

    #[tokio::test]
    async fn test_anonymous_upload_size_rejected() {
        let app = test_app();
        // Seeded anonymous ceiling is 1 MiB.
        let big = "x".repeat(1024 * 1024 + 1);
        let response = app
            .router
            .clone()
            .oneshot(multipart_upload("big.bin", &big, &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("maximum size"));
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let app = test_app();
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"isPrivate\"\r\n\r\ntrue\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/files/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_download_records_side_effects_exactly_once() {
        let app = test_app();
        let record = sample_record(Some(1));
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/download/{}", record.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("notes.txt"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello");

        // Counter incremented once, one access-log row, one audit event.
        let got = app.store.get_file(&record.id).await.unwrap().unwrap();
        assert_eq!(got.downloads, 1);
        let logs = app.store.list_access_logs(10, 0).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].file_id, record.id);
        let events = app.store.list_audit(10, 0).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "DOWNLOAD_FILE");
    }

    #[tokio::test]
    async fn test_download_unknown_id() {
        let app = test_app();
        let response = app
            .router
            .oneshot(
                Request::get("/api/files/download/deadbeef00000000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "File not found.");
    }

    #[tokio::test]
    async fn test_download_wrong_password_leaves_no_trace_in_access_log() {
        let app = test_app();
        let mut record = sample_record(Some(1));
        record.password = Some("hunter2".into());
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/download/{}", record.id))
                    .header("x-file-password", "wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let got = app.store.get_file(&record.id).await.unwrap().unwrap();
        assert_eq!(got.downloads, 0);
        assert!(app.store.list_access_logs(10, 0).await.unwrap().is_empty());
        // The failed attempt is still auditable.
        let events = app.store.list_audit(10, 0).await.unwrap();
        assert_eq!(events[0].action, "DOWNLOAD_ATTEMPT_FAILED");
    }

    #[tokio::test]
    async fn test_download_with_correct_password() {
        let app = test_app();
        let mut record = sample_record(Some(1));
        record.password = Some("hunter2".into());
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/download/{}", record.id))
                    .header("x-file-password", "hunter2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_download_owner_bypasses_password() {
        let app = test_app();
        let mut record = sample_record(Some(1));
        record.password = Some("hunter2".into());
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/download/{}", record.id))
                    .header("authorization", format!("Bearer {}", token(1, false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_download_quota_exhausted() {
        let app = test_app();
        let mut record = sample_record(Some(1));
        record.access_limit = Some(1);
        record.downloads = 1;
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/download/{}", record.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await["message"],
            "Access limit for this file has been reached."
        );
    }

    #[tokio::test]
    async fn test_download_expired_file() {
        let app = test_app();
        let mut record = sample_record(Some(1));
        record.expires_at = Some(Utc::now() - Duration::seconds(1));
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/download/{}", record.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn test_download_missing_blob() {
        let app = test_app();
        let record = sample_record(Some(1));
        // Record only, no blob.
        app.store.insert_file(record.clone()).await.unwrap();

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/download/{}", record.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["message"],
            "File not found on the server."
        );
    }

    #[tokio::test]
    async fn test_detail_private_file() {
        let app = test_app();
        let mut record = sample_record(Some(1));
        record.is_private = true;
        seed_file(&app, &record, "hello").await;

        // Anonymous is refused.
        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/{}", record.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // The owner sees a sanitized view.
        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/{}", record.id))
                    .header("authorization", format!("Bearer {}", token(1, false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["fileName"], "notes.txt");
        assert!(body["data"].get("password").is_none());
        assert!(body["data"].get("storageKey").is_none());
    }

    #[tokio::test]
    async fn test_edit_requires_ownership() {
        let app = test_app();
        let record = sample_record(Some(1));
        seed_file(&app, &record, "hello").await;

        let patch = |tok: String| {
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/files/{}", record.id))
                .header("authorization", format!("Bearer {tok}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"isPrivate": true}"#))
                .unwrap()
        };

        // A different user is refused.
        let response = app.router.clone().oneshot(patch(token(2, false))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // The owner succeeds.
        let response = app.router.clone().oneshot(patch(token(1, false))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["isPrivate"], true);

        let got = app.store.get_file(&record.id).await.unwrap().unwrap();
        assert!(got.is_private);
    }

    #[tokio::test]
    async fn test_edit_access_limit_zero_means_unlimited() {
        let app = test_app();
        let record = sample_record(Some(1));
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/files/{}", record.id))
                    .header("authorization", format!("Bearer {}", token(1, false)))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"accessLimit": 0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["accessLimit"], Value::Null);

        // The file stays downloadable.
        let response = app
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/files/download/{}", record.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_edit_rejects_anonymous() {
        let app = test_app();
        let record = sample_record(Some(1));
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/files/{}", record.id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"isPrivate": true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_without_history_is_hard() {
        let app = test_app();
        let record = sample_record(Some(1));
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/files/{}", record.id))
                    .header("authorization", format!("Bearer {}", token(1, false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "File deleted successfully."
        );

        assert!(app.store.get_file(&record.id).await.unwrap().is_none());
        assert!(!app.storage.exists(&record.storage_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_with_history_tombstones() {
        let app = test_app();
        let record = sample_record(Some(1));
        seed_file(&app, &record, "hello").await;
        app.store
            .append_access_log(&record.id, None, "127.0.0.1", "download")
            .await
            .unwrap();

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/files/{}", record.id))
                    .header("authorization", format!("Bearer {}", token(1, false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "File marked as deleted due to constraints."
        );

        // Tombstone: row kept, owner cleared, blob gone.
        let got = app.store.get_file(&record.id).await.unwrap().unwrap();
        assert_eq!(got.owner_id, None);
        assert!(got.is_private);
        assert!(!app.storage.exists(&record.storage_key).await.unwrap());
        let events = app.store.list_audit(10, 0).await.unwrap();
        assert_eq!(events[0].action, "DELETE_FILE_SOFT");
    }

    #[tokio::test]
    async fn test_admin_may_delete_any_file() {
        let app = test_app();
        let record = sample_record(Some(1));
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/files/{}", record.id))
                    .header("authorization", format!("Bearer {}", token(9, true)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_shows_only_own_files() {
        let app = test_app();
        seed_file(&app, &sample_record(Some(1)), "a").await;
        seed_file(&app, &sample_record(Some(1)), "b").await;
        seed_file(&app, &sample_record(Some(2)), "c").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/files")
                    .header("authorization", format!("Bearer {}", token(1, false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stats_aggregates_owner_files() {
        let app = test_app();
        let mut one = sample_record(Some(1));
        one.size = 100;
        one.downloads = 3;
        let mut two = sample_record(Some(1));
        two.size = 50;
        seed_file(&app, &one, "a").await;
        seed_file(&app, &two, "b").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/files/stats")
                    .header("authorization", format!("Bearer {}", token(1, false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["totalFiles"], 2);
        assert_eq!(body["data"]["totalSpaceUsed"], 150);
        assert_eq!(body["data"]["totalDownloads"], 3);
    }

    #[tokio::test]
    async fn test_verify_password() {
        let app = test_app();
        let mut record = sample_record(Some(1));
        record.password = Some("hunter2".into());
        seed_file(&app, &record, "hello").await;

        let verify = |password: &str| {
            Request::builder()
                .method("POST")
                .uri("/api/files/verify-password")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&serde_json::json!({
                        "fileId": record.id,
                        "password": password,
                    }))
                    .unwrap(),
                ))
                .unwrap()
        };

        let response = app.router.clone().oneshot(verify("hunter2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.router.clone().oneshot(verify("wrong")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verify_password_on_unprotected_file() {
        let app = test_app();
        let record = sample_record(Some(1));
        seed_file(&app, &record, "hello").await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/files/verify-password")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&serde_json::json!({
                            "fileId": record.id,
                            "password": "anything",
                        }))
                        .unwrap(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_verify_password_with_missing_fields() {
        let app = test_app();

        // An empty body still gets the standard error envelope, not a
        // bare extractor rejection.
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/files/verify-password")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "File ID and password are required.");
    }

    #[tokio::test]
    async fn test_admin_settings_roundtrip() {
        let app = test_app();

        // A regular user is refused.
        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/admin/settings")
                    .header("authorization", format!("Bearer {}", token(1, false)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // An admin updates and reads back.
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/admin/settings")
                    .header("authorization", format!("Bearer {}", token(9, true)))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"maxFileSize": "2097152"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["maxFileSize"], "2097152");
        // Seeded keys survive alongside the update.
        assert_eq!(body["data"]["maxAnonymousFileSize"], "1048576");
    }

    #[tokio::test]
    async fn test_updated_settings_govern_next_upload() {
        let app = test_app();

        // Tighten the anonymous ceiling to 10 bytes.
        app.store
            .put_setting("maxAnonymousFileSize", "10")
            .await
            .unwrap();

        let response = app
            .router
            .clone()
            .oneshot(multipart_upload("a.txt", "0123456789AB", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_logs_pagination() {
        let app = test_app();
        for i in 0..5 {
            app.store
                .append_audit(Some(1), "UPLOAD_FILE", serde_json::json!({"n": i}))
                .await
                .unwrap();
        }

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/admin/logs?limit=2&offset=1")
                    .header("authorization", format!("Bearer {}", token(9, true)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let entries = body["data"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first, offset skips the most recent.
        assert_eq!(entries[0]["details"], r#"{"n":3}"#);
    }

    #[tokio::test]
    async fn test_admin_access_logs() {
        let app = test_app();
        let record = sample_record(Some(1));
        seed_file(&app, &record, "hello").await;
        app.store
            .append_access_log(&record.id, Some(2), "198.51.100.4", "download")
            .await
            .unwrap();

        let response = app
            .router
            .clone()
            .oneshot(
                Request::get("/api/admin/file-access-logs")
                    .header("authorization", format!("Bearer {}", token(9, true)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"][0]["ip_address"], "198.51.100.4");
    }
}
