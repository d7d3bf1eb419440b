use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    routing::get,
};
use tower::ServiceExt;

use cover_backend::AppError;
use cover_backend::error::RenderError;
use cover_backend::request_id::{REQUEST_ID_HEADER, current_request_id};

async fn echo_handler() -> String {
    current_request_id().unwrap_or_default()
}

async fn fail_handler() -> Result<&'static str, AppError> {
    Err(AppError::Render(RenderError::InvalidDimensions {
        width: "0".into(),
        height: "600".into(),
        max: 4096,
    }))
}

fn build_app() -> Router {
    Router::new()
        .route("/echo", get(echo_handler))
        .route("/fail", get(fail_handler))
        .layer(axum::middleware::from_fn(
            cover_backend::request_id::request_id_middleware,
        ))
}

fn header_id(resp: &axum::response::Response) -> String {
    resp.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[tokio::test]
async fn generated_id_is_visible_to_handler_and_header() {
    let resp = build_app()
        .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
        .await
        .expect("request /echo");

    assert_eq!(resp.status(), StatusCode::OK);
    let id = header_id(&resp);
    assert!(id.starts_with("req_"), "id = {id}");
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, id.as_bytes());
}

#[tokio::test]
async fn unsafe_client_id_is_replaced() {
    let resp = build_app()
        .oneshot(
            Request::builder()
                .uri("/echo")
                .header(REQUEST_ID_HEADER, "bad id<script>")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /echo");

    let id = header_id(&resp);
    assert_ne!(id, "bad id<script>");
    assert!(id.starts_with("req_"));
}

#[tokio::test]
async fn error_body_carries_client_request_id() {
    let resp = build_app()
        .oneshot(
            Request::builder()
                .uri("/fail")
                .header(REQUEST_ID_HEADER, "cover.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /fail");

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header_id(&resp), "cover.req-001");

    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("parse json");
    assert_eq!(json["requestId"], "cover.req-001");
    assert_eq!(json["code"], "INVALID_DIMENSIONS");
}
