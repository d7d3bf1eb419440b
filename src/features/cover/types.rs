use serde::{Deserialize, Serialize};

use crate::config::{FontConfig, RenderConfig};
use crate::error::{AppError, RenderError};

use super::color::Rgba;

/// 未指定 `text` 时的默认文本
pub const DEFAULT_TEXT: &str = "BRAT";
/// 单次渲染允许的最大字符数
pub const MAX_TEXT_CHARS: usize = 256;

/// 生成接口的查询参数（全部按字符串接收，便于对非法值返回统一的错误体）
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct CoverQuery {
    /// 文本（自动转为大写，默认 BRAT）
    #[param(example = "BRAT")]
    pub text: Option<String>,
    /// 背景色（默认 #FFFFFF）
    #[param(example = "#8ACE00")]
    pub bg_color: Option<String>,
    /// 文字颜色（默认 #000000）
    #[param(example = "#000000")]
    pub text_color: Option<String>,
    /// 模糊效果：yes/no（默认 no）
    #[param(example = "no")]
    pub blur: Option<String>,
    /// 字体 URL（TTF/OTF）
    pub font_url: Option<String>,
    /// 画布宽度（默认 600）
    #[param(example = "600")]
    pub width: Option<String>,
    /// 画布高度（默认 600）
    #[param(example = "600")]
    pub height: Option<String>,
}

/// 校验后的渲染请求
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub text: String,
    pub bg_color: Rgba,
    pub text_color: Rgba,
    pub blur: bool,
    pub font_url: String,
    pub width: u32,
    pub height: u32,
}

/// 成功响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// `data:image/png;base64,...`
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub image_url: String,
}

impl CoverQuery {
    /// 套用默认值并校验，得到渲染请求。
    ///
    /// 宽高在下载字体之前校验，非法尺寸不会触发任何网络请求。
    pub fn into_request(
        self,
        render: &RenderConfig,
        font: &FontConfig,
    ) -> Result<RenderRequest, AppError> {
        let (width, height) = parse_dimensions(
            self.width.as_deref(),
            self.height.as_deref(),
            render,
        )?;

        let text = self.text.as_deref().unwrap_or(DEFAULT_TEXT).to_uppercase();
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(AppError::Validation(format!(
                "text 长度不能超过 {MAX_TEXT_CHARS} 个字符"
            )));
        }

        let bg_color = parse_color("bgColor", self.bg_color.as_deref(), Rgba::WHITE)?;
        let text_color = parse_color("textColor", self.text_color.as_deref(), Rgba::BLACK)?;

        let font_url = match self.font_url.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => font.default_url.clone(),
        };

        Ok(RenderRequest {
            text,
            bg_color,
            text_color,
            blur: parse_blur(self.blur.as_deref()),
            font_url,
            width,
            height,
        })
    }
}

/// 解析宽高：缺省取配置默认值；必须为 1..=max_dimension 的整数。
pub fn parse_dimensions(
    width: Option<&str>,
    height: Option<&str>,
    render: &RenderConfig,
) -> Result<(u32, u32), RenderError> {
    let max = render.max_dimension;
    let parse = |raw: Option<&str>, default: u32| -> Option<u32> {
        match raw.map(str::trim) {
            None | Some("") => Some(default),
            Some(v) => v.parse::<u32>().ok(),
        }
        .filter(|v| (1..=max).contains(v))
    };

    match (
        parse(width, render.default_width),
        parse(height, render.default_height),
    ) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(RenderError::InvalidDimensions {
            width: width.unwrap_or("(default)").to_string(),
            height: height.unwrap_or("(default)").to_string(),
            max,
        }),
    }
}

fn parse_color(field: &str, raw: Option<&str>, default: Rgba) -> Result<Rgba, AppError> {
    match raw {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|e| AppError::Validation(format!("{field}: {e}"))),
    }
}

/// 前端表单只会传 yes/no；也接受常见布尔写法，其余值一律视为关闭。
fn parse_blur(raw: Option<&str>) -> bool {
    raw.map(|v| v.trim().to_ascii_lowercase())
        .is_some_and(|v| matches!(v.as_str(), "yes" | "true" | "1" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfgs() -> (RenderConfig, FontConfig) {
        (RenderConfig::default(), FontConfig::default())
    }

    #[test]
    fn empty_query_uses_defaults() {
        let (r, f) = cfgs();
        let req = CoverQuery::default().into_request(&r, &f).expect("valid");
        assert_eq!(req.text, "BRAT");
        assert_eq!(req.bg_color, Rgba::WHITE);
        assert_eq!(req.text_color, Rgba::BLACK);
        assert!(!req.blur);
        assert_eq!(req.font_url, f.default_url);
        assert_eq!((req.width, req.height), (600, 600));
    }

    #[test]
    fn text_is_upper_cased() {
        let (r, f) = cfgs();
        let q = CoverQuery {
            text: Some("hello wörld".into()),
            ..CoverQuery::default()
        };
        assert_eq!(q.into_request(&r, &f).unwrap().text, "HELLO WÖRLD");
    }

    #[test]
    fn invalid_dimensions_fail_fast() {
        let r = RenderConfig::default();
        for (w, h) in [
            (Some("0"), None),
            (Some("abc"), None),
            (None, Some("-5")),
            (Some("12.5"), None),
            (Some("4097"), None),
        ] {
            let err = parse_dimensions(w, h, &r).expect_err("must fail");
            assert!(matches!(err, RenderError::InvalidDimensions { .. }));
            assert!(err.to_string().contains("invalid dimensions"));
        }
        assert_eq!(parse_dimensions(Some(" 800 "), Some("400"), &r), Ok((800, 400)));
        assert_eq!(parse_dimensions(Some(""), None, &r), Ok((600, 600)));
    }

    #[test]
    fn blur_accepts_yes_and_boolean_spellings() {
        assert!(parse_blur(Some("yes")));
        assert!(parse_blur(Some("TRUE")));
        assert!(parse_blur(Some("1")));
        assert!(!parse_blur(Some("no")));
        assert!(!parse_blur(Some("maybe")));
        assert!(!parse_blur(None));
    }

    #[test]
    fn bad_color_is_validation_error_naming_the_field() {
        let (r, f) = cfgs();
        let q = CoverQuery {
            text_color: Some("#12".into()),
            ..CoverQuery::default()
        };
        match q.into_request(&r, &f) {
            Err(AppError::Validation(msg)) => assert!(msg.starts_with("textColor")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn blank_font_url_falls_back_to_default() {
        let (r, f) = cfgs();
        let q = CoverQuery {
            font_url: Some("  ".into()),
            ..CoverQuery::default()
        };
        assert_eq!(q.into_request(&r, &f).unwrap().font_url, f.default_url);
    }

    #[test]
    fn overlong_text_is_rejected() {
        let (r, f) = cfgs();
        let q = CoverQuery {
            text: Some("x".repeat(MAX_TEXT_CHARS + 1)),
            ..CoverQuery::default()
        };
        assert!(matches!(
            q.into_request(&r, &f),
            Err(AppError::Validation(_))
        ));
    }
}
