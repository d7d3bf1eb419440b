use utoipa::OpenApi;
use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::Modify;

/// 为 Swagger UI 提供业务接口前缀的 Servers 配置。
///
/// 封面接口挂在 `config.api.prefix` 下（默认 `/api`），`/health` 不带前缀，
/// 因此额外提供 `/` 作为备用 server。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api")
                    .description(Some(
                        "业务接口前缀：对应 config.api.prefix（可通过 APP_API__PREFIX 覆盖）",
                    )),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（用于 /health）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::cover::handler::generate_cover,
    ),
    components(schemas(
        crate::features::cover::types::GenerateResponse,
        crate::features::health::handler::HealthResponse,
        crate::error::ErrorBody,
    )),
    modifiers(&ApiServers),
    tags(
        (
            name = "Cover",
            description = "文字封面：按文本、颜色、字体 URL 与尺寸生成 PNG（base64 data URL）。"
        ),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Cover Backend API",
        version = env!("CARGO_PKG_VERSION"),
        description = "文字封面生成服务（Axum + utoipa）。除 /health 外，接口实际挂载在 `config.api.prefix`（默认 /api）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;
