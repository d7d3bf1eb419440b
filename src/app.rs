use axum::Router;
use tower_http::compression::CompressionLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::cors::build_cors_layer;
use crate::features::{cover, health, ui};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 压缩策略：排除图片与流式响应，其余（JSON / HTML）按默认阈值压缩。
///
/// 生成接口返回的 JSON 内嵌 base64 PNG，压缩仍有收益。
pub fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    SizeAbove::default()
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE)
        .and(NotForContentType::const_new("application/octet-stream"))
}

/// 组装完整路由：首页、健康检查、业务接口、文档与全局中间件。
pub fn build_app(config: &AppConfig, state: AppState) -> Router {
    let api_router = Router::<AppState>::new().merge(cover::create_cover_router());

    let mut app = Router::<AppState>::new()
        .merge(ui::create_ui_router())
        .route("/health", axum::routing::get(health::health_check))
        .nest(&config.api.prefix, api_router)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state);

    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }

    app.layer(CompressionLayer::new().compress_when(compression_predicate()))
        // 最外层：CORS 预检与压缩后的响应同样带上 request id
        .layer(axum::middleware::from_fn(request_id_middleware))
}

#[cfg(test)]
mod tests {
    use super::compression_predicate;
    use axum::body::Body;
    use axum::http::{Response as HttpResponse, header};
    use tower_http::compression::predicate::Predicate;

    fn should_compress_for(ct: &str) -> bool {
        let body_bytes = vec![b'x'; 2048];
        let resp = HttpResponse::builder()
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(body_bytes))
            .unwrap();
        compression_predicate().should_compress(&resp)
    }

    #[test]
    fn json_and_html_are_compressed() {
        assert!(should_compress_for("application/json"));
        assert!(should_compress_for("text/html; charset=utf-8"));
    }

    #[test]
    fn images_and_streams_are_not() {
        assert!(!should_compress_for("image/png"));
        assert!(!should_compress_for("text/event-stream"));
        assert!(!should_compress_for("application/octet-stream"));
    }
}
