use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 字体下载 / 注册失败
    #[error("字体加载失败: {0}")]
    FontLoad(#[from] FontLoadError),

    /// 画布尺寸非法或绘制失败
    #[error("图像渲染错误: {0}")]
    Render(#[from] RenderError),

    /// 参数校验错误
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 字体获取错误类型
#[derive(Error, Debug, Clone)]
pub enum FontLoadError {
    /// 仅接受 http/https 绝对地址
    #[error("invalid font url: {url}")]
    InvalidUrl { url: String },

    /// 网络请求失败（连接、超时、读取中断）
    #[error("failed to fetch font {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// 上游返回非 2xx
    #[error("font host returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// 响应体超过配置上限
    #[error("font {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    /// 响应体无法解析为字体
    #[error("response from {url} is not a usable font")]
    NotAFont { url: String },

    /// 落盘或注册失败
    #[error("failed to store font {url}: {reason}")]
    Io { url: String, reason: String },
}

impl FontLoadError {
    /// 原始失败原因（若有），用于响应中的 `details` 字段。
    pub fn cause(&self) -> Option<&str> {
        match self {
            FontLoadError::Fetch { reason, .. } | FontLoadError::Io { reason, .. } => {
                Some(reason.as_str())
            }
            _ => None,
        }
    }
}

/// 渲染错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// 宽高必须为正整数且不超过上限
    #[error("invalid dimensions: width={width}, height={height} (expected 1..={max})")]
    InvalidDimensions {
        width: String,
        height: String,
        max: u32,
    },

    /// 文本测量失败
    #[error("failed to measure text: {0}")]
    Measure(String),

    /// SVG 解析失败
    #[error("failed to parse SVG: {0}")]
    Svg(String),

    /// 画布创建失败
    #[error("failed to create pixmap {width}x{height}")]
    Pixmap { width: u32, height: u32 },

    /// PNG 编码失败
    #[error("PNG encode error: {0}")]
    Encode(String),
}

/// 错误响应体。
///
/// 与前端约定：失败时只读取 `error` 字段展示；`code` 供程序化判断，
/// `details` 仅在存在底层原因时返回。
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// 人类可读的错误信息
    #[schema(example = "字体加载失败: font host returned HTTP 404 for https://example.com/a.ttf")]
    pub error: String,

    /// 稳定的错误码
    #[schema(example = "FONT_LOAD_FAILED")]
    pub code: String,

    /// 可选：底层原因
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// 可选：请求追踪 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        // 前端只区分成功与失败，生成接口的所有失败统一以 500 返回。
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn stable_code(&self) -> &'static str {
        match self {
            AppError::FontLoad(_) => "FONT_LOAD_FAILED",
            AppError::Render(RenderError::InvalidDimensions { .. }) => "INVALID_DIMENSIONS",
            AppError::Render(_) => "RENDER_FAILED",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            AppError::FontLoad(e) => e.cause().map(str::to_string),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::FontLoad(e) => tracing::warn!("请求失败（字体）: {}", e),
            other => tracing::error!("请求失败: {}", other),
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: self.stable_code().to_string(),
            details: self.details(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(body).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl FontLoadError {
    /// 将 reqwest 错误归类为字体获取错误，保留原始原因文本。
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return FontLoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }
        let reason = if err.is_timeout() {
            format!("timeout: {err}")
        } else {
            err.to_string()
        };
        FontLoadError::Fetch {
            url: url.to_string(),
            reason,
        }
    }

    pub fn from_io(url: &str, err: std::io::Error) -> Self {
        FontLoadError::Io {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}
