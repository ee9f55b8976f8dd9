pub mod health;

use anyhow::{Context, Result};
use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::resumes::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.config.cors_origin)?;

    Ok(Router::new()
        .route("/", get(health::root_handler))
        .route("/docs", get(health::docs_handler))
        .route("/health", get(health::health_handler))
        .route(
            "/resumes",
            get(handlers::handle_list_resumes).post(handlers::handle_create_resume),
        )
        .route(
            "/resumes/:id",
            get(handlers::handle_get_resume)
                .put(handlers::handle_update_resume)
                .delete(handlers::handle_delete_resume),
        )
        .layer(cors)
        .with_state(state))
}

/// Single allowed origin; any method or header from it, with credentials.
fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("CORS_ORIGIN '{origin}' is not a valid header value"))?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::test_support::test_pool;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_app() -> (TempDir, Router) {
        let (dir, db) = test_pool().await;
        let config = Config::from_lookup(|_| None).unwrap();
        let app = build_router(AppState { db, config }).unwrap();
        (dir, app)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn is_generated_id(id: &str) -> bool {
        id.strip_prefix("resume-")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    }

    #[tokio::test]
    async fn test_create_with_name_only() {
        let (_dir, app) = test_app().await;

        let before = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let payload = json!({"name": "A"});
        let (status, body) = send(&app, Method::POST, "/resumes", Some(payload)).await;
        let after = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();

        assert_eq!(status, StatusCode::OK);
        assert!(is_generated_id(body["id"].as_str().unwrap()));
        assert_eq!(body["name"], "A");
        assert_eq!(body["tags"], json!([]));
        assert_eq!(body["data"], json!({}));
        let stamped = body["lastEdited"].as_str().unwrap();
        assert!(stamped == before || stamped == after);
    }

    #[tokio::test]
    async fn test_create_empty_body_fills_defaults() {
        let (_dir, app) = test_app().await;

        let (status, body) = send(&app, Method::POST, "/resumes", Some(json!({}))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(is_generated_id(body["id"].as_str().unwrap()));
        assert_eq!(body["name"], "Untitled Resume");
        assert_eq!(body["tags"], json!([]));
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let (_dir, app) = test_app().await;
        let payload = json!({
            "id": "resume-42",
            "name": "Platform",
            "tags": ["rust", "k8s"],
            "data": {"experiences": [{"company": "Acme"}]}
        });

        let (_, created) = send(&app, Method::POST, "/resumes", Some(payload)).await;
        let (status, fetched) = send(&app, Method::GET, "/resumes/resume-42", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_conflict() {
        let (_dir, app) = test_app().await;
        let payload = json!({"id": "resume-1", "name": "A"});

        send(&app, Method::POST, "/resumes", Some(payload.clone())).await;
        let (status, body) = send(&app, Method::POST, "/resumes", Some(payload)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_get_unknown_is_404() {
        let (_dir, app) = test_app().await;

        let (status, body) = send(&app, Method::GET, "/resumes/nope", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Resume not found");
    }

    #[tokio::test]
    async fn test_update_only_touches_given_keys() {
        let (_dir, app) = test_app().await;
        let payload = json!({"id": "r", "name": "A", "tags": ["x"], "data": {"k": 1}});
        send(&app, Method::POST, "/resumes", Some(payload)).await;

        let patch = json!({"name": "B"});
        let (status, body) = send(&app, Method::PUT, "/resumes/r", Some(patch)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "B");
        assert_eq!(body["tags"], json!(["x"]));
        assert_eq!(body["data"], json!({"k": 1}));

        let (_, body) = send(&app, Method::PUT, "/resumes/r", Some(json!({"tags": []}))).await;
        assert_eq!(body["name"], "B");
        assert_eq!(body["tags"], json!([]));
    }

    #[tokio::test]
    async fn test_non_string_name_is_stored_as_text() {
        let (_dir, app) = test_app().await;

        let payload = json!({"id": "r", "name": 5});
        let (status, body) = send(&app, Method::POST, "/resumes", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "5");

        let patch = json!({"name": 7});
        let (status, body) = send(&app, Method::PUT, "/resumes/r", Some(patch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "7");
    }

    #[tokio::test]
    async fn test_update_null_name_is_ignored_but_null_tags_are_stored() {
        let (_dir, app) = test_app().await;
        let payload = json!({"id": "r", "name": "A", "tags": ["x"], "data": {"k": 1}});
        send(&app, Method::POST, "/resumes", Some(payload)).await;

        let patch = json!({"name": null, "tags": null});
        let (status, body) = send(&app, Method::PUT, "/resumes/r", Some(patch)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "A");
        assert_eq!(body["tags"], Value::Null);
        assert_eq!(body["data"], json!({"k": 1}));

        let (_, fetched) = send(&app, Method::GET, "/resumes/r", None).await;
        assert_eq!(fetched["tags"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_unknown_is_404() {
        let (_dir, app) = test_app().await;

        let patch = json!({"name": "B"});
        let (status, _) = send(&app, Method::PUT, "/resumes/nope", Some(patch)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let (_dir, app) = test_app().await;
        send(&app, Method::POST, "/resumes", Some(json!({"id": "r"}))).await;

        let (first, body) = send(&app, Method::DELETE, "/resumes/r", None).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));

        let (second, body) = send(&app, Method::DELETE, "/resumes/r", None).await;
        assert_eq!(second, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Resume not found");

        let (status, _) = send(&app, Method::GET, "/resumes/r", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_puts_recent_edit_first() {
        let (_dir, app) = test_app().await;
        send(&app, Method::POST, "/resumes", Some(json!({"id": "old"}))).await;
        send(&app, Method::POST, "/resumes", Some(json!({"id": "new"}))).await;
        send(&app, Method::PUT, "/resumes/old", Some(json!({"name": "touched"}))).await;

        let (status, body) = send(&app, Method::GET, "/resumes", None).await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["old", "new"]);
    }

    #[tokio::test]
    async fn test_root_redirects_to_docs() {
        let (_dir, app) = test_app().await;
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/docs");

        let (status, body) = send(&app, Method::GET, "/docs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["routes"].as_array().is_some_and(|r| !r.is_empty()));
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let (_dir, app) = test_app().await;
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/resumes")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[test]
    fn test_invalid_cors_origin_is_rejected() {
        assert!(cors_layer("bad\norigin").is_err());
    }
}
