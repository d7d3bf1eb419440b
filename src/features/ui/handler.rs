use std::sync::OnceLock;

use axum::{Router, extract::State, response::Html, routing::get};
use minijinja::{Environment, context};

use crate::error::AppError;
use crate::features::cover::types::{DEFAULT_TEXT, MAX_TEXT_CHARS};
use crate::state::AppState;

const INDEX_TEMPLATE: &str = "index.html";

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

/// 页面模板随二进制一起编译，运行时不依赖资源目录。
fn template_env() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(|| {
        let mut env = Environment::new();
        if let Err(e) = env.add_template(
            INDEX_TEMPLATE,
            include_str!("../../../resources/templates/index.html.jinja"),
        ) {
            tracing::error!("加载页面模板失败: {}", e);
        }
        env
    })
}

/// 渲染首页表单；`endpoint` 为封面生成接口的完整路径。
pub fn render_index(state: &AppState) -> Result<String, AppError> {
    let tpl = template_env()
        .get_template(INDEX_TEMPLATE)
        .map_err(|e| AppError::Internal(format!("页面模板不可用: {e}")))?;
    tpl.render(context! {
        title => "文字封面生成器",
        endpoint => format!("{}/generate", state.api_prefix.trim_end_matches('/')),
        default_text => DEFAULT_TEXT,
        default_font_url => state.font.default_url.as_str(),
        default_width => state.render.default_width,
        default_height => state.render.default_height,
        max_dimension => state.render.max_dimension,
        max_text_chars => MAX_TEXT_CHARS,
    })
    .map_err(|e| AppError::Internal(format!("渲染页面失败: {e}")))
}

pub async fn index_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    render_index(&state).map(Html)
}

pub fn create_ui_router() -> Router<AppState> {
    Router::<AppState>::new().route("/", get(index_page))
}
