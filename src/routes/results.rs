//! OCR result cache routes
//!
//! Per-user persistence of finished extractions. Callers identify
//! themselves with the `x-user-id` header; every query is scoped to that
//! user, so one user can never read or delete another's entries.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::db::NewOcrResult;
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(save_result).get(list_results))
        .route("/check", post(check_result))
        .route("/:key", get(get_result).delete(delete_result))
}

fn require_user(headers: &HeaderMap) -> Result<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveResultBody {
    file_name: String,
    file_size: i64,
    text: String,
    html: Option<String>,
    #[serde(default)]
    confidence: f64,
    method: String,
    #[serde(default = "default_pages")]
    pages: i64,
}

fn default_pages() -> i64 {
    1
}

async fn save_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SaveResultBody>,
) -> Result<Json<serde_json::Value>> {
    let user_id = require_user(&headers)?;

    if body.file_name.trim().is_empty() {
        return Err(AppError::BadRequest("fileName is required".to_string()));
    }
    if body.file_size <= 0 {
        return Err(AppError::BadRequest("fileSize must be positive".to_string()));
    }

    let record = state
        .results()
        .upsert(
            &user_id,
            &NewOcrResult {
                file_name: body.file_name,
                file_size: body.file_size,
                text: body.text,
                html: body.html,
                confidence: body.confidence,
                method: body.method,
                pages: body.pages,
            },
        )
        .await?;

    tracing::debug!(user = %user_id, hash = %record.file_hash, "saved OCR result");
    Ok(Json(json!({ "success": true, "data": record })))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

async fn list_results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>> {
    let user_id = require_user(&headers)?;
    let limit = query.limit.clamp(1, 100);
    let page = query.page.max(1);

    let (rows, total) = state.results().list(&user_id, page, limit).await?;

    Ok(Json(json!({
        "success": true,
        "data": rows,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckBody {
    file_name: String,
    file_size: i64,
}

async fn check_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CheckBody>,
) -> Result<Json<serde_json::Value>> {
    let user_id = require_user(&headers)?;

    let record = state
        .results()
        .check(&user_id, &body.file_name, body.file_size)
        .await?;

    Ok(match record {
        Some(data) => Json(json!({ "success": true, "exists": true, "data": data })),
        None => Json(json!({ "success": true, "exists": false })),
    })
}

async fn get_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_hash): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let user_id = require_user(&headers)?;

    let record = state
        .results()
        .get_by_hash(&user_id, &file_hash)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No OCR result for hash {}", file_hash)))?;

    Ok(Json(json!({ "success": true, "data": record })))
}

async fn delete_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let user_id = require_user(&headers)?;

    if !state.results().delete(&user_id, &id).await? {
        return Err(AppError::NotFound(format!("No OCR result with id {}", id)));
    }

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{file_identity_hash, test_pool};
    use crate::extract::{ExtractionEngine, MockTextLayer, TextLayerPolicy};
    use crate::ocr::engine::mock::MockEngine;
    use crate::ocr::WorkerPool;
    use crate::raster::mock::MockRasterizer;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app() -> Router {
        let workers = Arc::new(WorkerPool::new(
            Arc::new(MockEngine::with_text("", 0.0)),
            Duration::from_secs(5),
        ));
        let engine = ExtractionEngine::new(
            Arc::new(MockTextLayer::with_text("unused")),
            Arc::new(MockRasterizer::with_pages(0)),
            workers.clone(),
            TextLayerPolicy::default(),
            2.5,
        );
        let state =
            AppState::with_components(Config::default(), test_pool().await, engine, workers);
        Router::new()
            .nest("/api/v1/ocr-results", router())
            .with_state(state)
    }

    fn json_request(method: &str, uri: &str, user: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn bare_request(method: &str, uri: &str, user: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn save_body(name: &str) -> serde_json::Value {
        json!({
            "fileName": name,
            "fileSize": 2048,
            "text": "nội dung đã nhận dạng",
            "confidence": 90.0,
            "method": "ocr",
            "pages": 2,
        })
    }

    #[tokio::test]
    async fn test_missing_user_header_unauthorized() {
        let app = app().await;
        let response = app
            .oneshot(bare_request("GET", "/api/v1/ocr-results", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_save_then_check_hit() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/ocr-results",
                Some("user-1"),
                save_body("don-khoi-kien.pdf"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let saved = json_body(response).await;
        assert_eq!(saved["success"], true);
        assert_eq!(saved["data"]["fileName"], "don-khoi-kien.pdf");

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/ocr-results/check",
                Some("user-1"),
                json!({ "fileName": "don-khoi-kien.pdf", "fileSize": 2048 }),
            ))
            .await
            .unwrap();
        let checked = json_body(response).await;
        assert_eq!(checked["exists"], true);
        assert_eq!(checked["data"]["text"], "nội dung đã nhận dạng");
    }

    #[tokio::test]
    async fn test_check_miss() {
        let app = app().await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/ocr-results/check",
                Some("user-1"),
                json!({ "fileName": "never-seen.pdf", "fileSize": 1 }),
            ))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["exists"], false);
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_list_excludes_text() {
        let app = app().await;
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/ocr-results",
                Some("user-1"),
                save_body("a.pdf"),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(bare_request("GET", "/api/v1/ocr-results?page=1&limit=10", Some("user-1")))
            .await
            .unwrap();
        let json = json_body(response).await;

        assert_eq!(json["pagination"]["total"], 1);
        let entry = &json["data"][0];
        assert_eq!(entry["fileName"], "a.pdf");
        assert!(entry.get("text").is_none());
    }

    #[tokio::test]
    async fn test_get_by_hash() {
        let app = app().await;
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/ocr-results",
                Some("user-1"),
                save_body("a.pdf"),
            ))
            .await
            .unwrap();

        let hash = file_identity_hash("user-1", "a.pdf", 2048);
        let response = app
            .oneshot(bare_request(
                "GET",
                &format!("/api/v1/ocr-results/{}", hash),
                Some("user-1"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["data"]["fileHash"], hash);
    }

    #[tokio::test]
    async fn test_delete_foreign_entry_not_found() {
        let app = app().await;
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/ocr-results",
                Some("user-1"),
                save_body("a.pdf"),
            ))
            .await
            .unwrap();
        let saved = json_body(response).await;
        let id = saved["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(bare_request(
                "DELETE",
                &format!("/api/v1/ocr-results/{}", id),
                Some("user-2"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(bare_request(
                "DELETE",
                &format!("/api/v1/ocr-results/{}", id),
                Some("user-1"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_save_validates_file_size() {
        let app = app().await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/ocr-results",
                Some("user-1"),
                json!({
                    "fileName": "a.pdf",
                    "fileSize": 0,
                    "text": "",
                    "method": "ocr",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
