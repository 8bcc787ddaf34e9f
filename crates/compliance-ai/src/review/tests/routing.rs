use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::{
    build_router, read_json_body, subject_issue, FailMode, FailingProvider, ScriptedProvider,
    ICF_DOCUMENT_TEXT,
};

fn review_request(body: serde_json::Value) -> Request<Body> {
    Request::post("/api/v1/compliance/review")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn greeting_names_the_project() {
    let router = build_router(Arc::new(ScriptedProvider { issues: Vec::new() }));
    let response = router
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("message"),
        Some(&json!("Welcome to Compliance Review Service"))
    );
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let router = build_router(Arc::new(ScriptedProvider { issues: Vec::new() }));
    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("healthy")));
}

#[tokio::test]
async fn empty_document_reviews_to_no_matching_reference() {
    let router = build_router(Arc::new(ScriptedProvider { issues: Vec::new() }));
    let response = router
        .oneshot(review_request(json!({ "document_id": "d1", "content": "" })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("reference_id"), Some(&serde_json::Value::Null));
    assert_eq!(payload.get("status"), Some(&json!("no_matching_reference")));
    assert_eq!(payload.get("issues"), Some(&json!([])));
}

#[tokio::test]
async fn wrapped_document_shape_reviews_successfully() {
    let router = build_router(Arc::new(ScriptedProvider {
        issues: vec![subject_issue()],
    }));
    let response = router
        .oneshot(review_request(json!({
            "document": { "id": "d2", "content": ICF_DOCUMENT_TEXT, "title": "Consent note" }
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("reference_id"), Some(&json!("ref-icf-01")));
    let issues = payload
        .get("issues")
        .and_then(serde_json::Value::as_array)
        .expect("issues array");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].get("quoted_text"), Some(&json!("subject")));
    assert_eq!(
        issues[0].get("offset"),
        Some(&json!({ "start": 4, "end": 11 }))
    );
}

#[tokio::test]
async fn flat_document_shape_reviews_successfully() {
    let router = build_router(Arc::new(ScriptedProvider {
        issues: vec![subject_issue()],
    }));
    let response = router
        .oneshot(review_request(json!({
            "document_id": "d2",
            "content": ICF_DOCUMENT_TEXT,
            "metadata": { "title": "Consent note", "format": "txt" }
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("reviewed")));
}

#[tokio::test]
async fn missing_content_is_a_bad_request() {
    let router = build_router(Arc::new(ScriptedProvider { issues: Vec::new() }));
    let response = router
        .oneshot(review_request(json!({ "document_id": "d1" })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("error"),
        Some(&json!("document content is required"))
    );
}

#[tokio::test]
async fn missing_id_is_a_bad_request() {
    let router = build_router(Arc::new(ScriptedProvider { issues: Vec::new() }));
    let response = router
        .oneshot(review_request(json!({ "content": "some text" })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let router = build_router(Arc::new(ScriptedProvider { issues: Vec::new() }));
    let response = router
        .oneshot(
            Request::post("/api/v1/compliance/review")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unavailable_provider_maps_to_bad_gateway() {
    let router = build_router(Arc::new(FailingProvider {
        mode: FailMode::Unavailable,
    }));
    let response = router
        .oneshot(review_request(json!({
            "document_id": "d2",
            "content": ICF_DOCUMENT_TEXT
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("retryable"), Some(&json!(true)));
}

#[tokio::test]
async fn rejected_provider_maps_to_internal_error() {
    let router = build_router(Arc::new(FailingProvider {
        mode: FailMode::Rejected,
    }));
    let response = router
        .oneshot(review_request(json!({
            "document_id": "d2",
            "content": ICF_DOCUMENT_TEXT
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("retryable"), Some(&json!(false)));
}
