use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};

use crate::{error::AppError, state::AppState};

use super::renderer::{self, render_cover_async};
use super::types::{CoverQuery, GenerateResponse};

#[utoipa::path(
    get,
    path = "/generate",
    summary = "生成文字封面",
    description = "按查询参数把文本排版到纯色画布上，返回 PNG 的 base64 data URL。字体首次使用时从 fontUrl 下载并缓存，之后复用；文本会被转为大写，并自动缩小字号以适配 90% 画布宽度。",
    params(CoverQuery),
    responses(
        (status = 200, description = "生成成功", body = GenerateResponse),
        (status = 500, description = "参数无效、字体加载失败或渲染失败", body = crate::error::ErrorBody)
    ),
    tag = "Cover"
)]
pub async fn generate_cover(
    State(state): State<AppState>,
    query: Result<Query<CoverQuery>, QueryRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let t0 = Instant::now();
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let req = query.into_request(&state.render, &state.font)?;

    let font = state.fonts.resolve(&req.font_url).await?;
    let t_font = t0.elapsed();

    let (text_len, width, height, blur) = (req.text.chars().count(), req.width, req.height, req.blur);
    let rendered = render_cover_async(
        req,
        font,
        state.render.clone(),
        state.render_semaphore.clone(),
    )
    .await?;
    let t_render = t0.elapsed();

    let image_url = renderer::to_data_url(&rendered.png);
    tracing::info!(
        "封面生成完成: {}x{} 字数={} 模糊={} 字号={} png={}B 字体={:?} 渲染={:?} 总计={:?}",
        width,
        height,
        text_len,
        blur,
        rendered.font_size,
        rendered.png.len(),
        t_font,
        t_render - t_font,
        t0.elapsed()
    );

    Ok(Json(GenerateResponse { image_url }))
}

/// 封面路由；`/generate-cover` 为兼容旧版表单页的别名。
pub fn create_cover_router() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/generate", get(generate_cover))
        .route("/generate-cover", get(generate_cover))
}
