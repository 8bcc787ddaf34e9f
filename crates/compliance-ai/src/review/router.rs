use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Document, DocumentMetadata};
use super::pipeline::{ComplianceReviewService, ReviewError};

/// Shared state for the review surface.
#[derive(Clone)]
pub struct ReviewApi {
    pub service: Arc<ComplianceReviewService>,
    pub project_name: String,
}

/// Router builder exposing the review surface. `api_prefix` is the
/// front-end's `API_V1_STR` value.
pub fn review_router(api: ReviewApi, api_prefix: &str) -> Router {
    let review_path = format!("{}/compliance/review", api_prefix.trim_end_matches('/'));
    Router::new()
        .route("/", get(greeting_handler))
        .route("/health", get(health_handler))
        .route(&review_path, post(review_handler))
        .with_state(api)
}

pub(crate) async fn greeting_handler(State(api): State<ReviewApi>) -> Json<serde_json::Value> {
    Json(json!({ "message": format!("Welcome to {}", api.project_name) }))
}

pub(crate) async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

pub(crate) async fn review_handler(
    State(api): State<ReviewApi>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            let body = json!({ "error": rejection.body_text() });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let document = match request.into_document() {
        Ok(document) => document,
        Err(error) => {
            let body = json!({ "error": error });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    match api.service.review(&document).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(ReviewError::MissingDocumentId) => {
            let body = json!({ "error": ReviewError::MissingDocumentId.to_string() });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
        Err(err) if err.is_retryable() => {
            let body = json!({ "error": err.to_string(), "retryable": true });
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
        Err(err) => {
            let body = json!({ "error": err.to_string(), "retryable": false });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Accepts both request shapes: a wrapped `{ "document": {...} }` and the
/// flat `{ "document_id", "content", "metadata"? }`. Validation happens in
/// [`ReviewRequest::into_document`] so both shapes report 400 uniformly.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    document: Option<DocumentPayload>,
    #[serde(default)]
    document_id: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Deserialize)]
struct DocumentPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(flatten)]
    metadata: DocumentMetadata,
}

impl ReviewRequest {
    pub fn into_document(self) -> Result<Document, String> {
        let (id, content, metadata) = match self.document {
            Some(document) => (document.id, document.content, document.metadata),
            None => (
                self.document_id,
                self.content,
                self.metadata.unwrap_or_default(),
            ),
        };

        let id = id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| "document id is required".to_string())?;
        let content = content.ok_or_else(|| "document content is required".to_string())?;

        Ok(Document {
            id,
            content,
            metadata,
        })
    }
}
