use std::sync::Arc;

use resvg::usvg::{self, fontdb};

use crate::error::RenderError;

use super::renderer::escape_xml;

/// 字号下限
pub const MIN_FONT_SIZE: f32 = 10.0;
/// 文本宽度最多占画布宽度的比例
pub const FIT_RATIO: f32 = 0.9;
/// 初始字号相对画布宽度的比例
pub const WIDTH_RATIO: f32 = 0.2;
/// 初始字号相对画布高度的比例（窄高画布时由它决定）
pub const HEIGHT_RATIO: f32 = 0.3;

/// 给定字号下整行文本的宽度（像素）。
pub trait TextMeasure {
    fn text_width(&self, font_size: f32) -> Result<f32, RenderError>;
}

impl<F> TextMeasure for F
where
    F: Fn(f32) -> f32,
{
    fn text_width(&self, font_size: f32) -> Result<f32, RenderError> {
        Ok(self(font_size))
    }
}

/// 字号选择结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontFit {
    pub size: f32,
    pub text_width: f32,
    /// 缩小的次数
    pub steps: u32,
}

/// 初始字号：取宽、高两个比例中较小者，且不低于下限。
pub fn initial_font_size(width: u32, height: u32) -> f32 {
    (width as f32 * WIDTH_RATIO)
        .min(height as f32 * HEIGHT_RATIO)
        .max(MIN_FONT_SIZE)
}

/// 逐 1 像素缩小字号，直到文本宽度不超过画布宽度的 90% 或到达下限。
pub fn fit_font_size(
    measure: &impl TextMeasure,
    canvas_width: u32,
    start: f32,
) -> Result<FontFit, RenderError> {
    let limit = canvas_width as f32 * FIT_RATIO;
    let mut size = start.max(MIN_FONT_SIZE);
    let mut text_width = measure.text_width(size)?;
    let mut steps = 0;

    while text_width > limit && size > MIN_FONT_SIZE {
        size = (size - 1.0).max(MIN_FONT_SIZE);
        text_width = measure.text_width(size)?;
        steps += 1;
    }

    Ok(FontFit {
        size,
        text_width,
        steps,
    })
}

/// 基于 usvg 排版的文本测量。
///
/// 只在参考字号下排版一次：轮廓字体不做 hinting，宽度与字号成正比，
/// 其余字号按比例换算，避免缩小循环里反复解析 SVG。
pub struct SvgTextMeasurer {
    width_per_px: f32,
}

impl SvgTextMeasurer {
    const REFERENCE_SIZE: f32 = 100.0;

    pub fn new(text: &str, family: &str, db: Arc<fontdb::Database>) -> Result<Self, RenderError> {
        let width = measure_once(text, family, db, Self::REFERENCE_SIZE)?;
        Ok(Self {
            width_per_px: width / Self::REFERENCE_SIZE,
        })
    }
}

impl TextMeasure for SvgTextMeasurer {
    fn text_width(&self, font_size: f32) -> Result<f32, RenderError> {
        Ok(self.width_per_px * font_size)
    }
}

/// 整行文本的步进宽度（advance），与浏览器 `measureText().width` 一致。
///
/// usvg 的文本包围盒由每个字簇的 advance 与字体 ascent/descent 拼成，
/// 不看字形轮廓，因此首尾空格、侧边距都计入宽度。
fn measure_once(
    text: &str,
    family: &str,
    db: Arc<fontdb::Database>,
    font_size: f32,
) -> Result<f32, RenderError> {
    if text.trim().is_empty() {
        return Ok(0.0);
    }
    // 画布尺寸只影响视口，不会裁剪测量结果
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"><text x="0" y="{font_size}" font-family="'{family}'" font-size="{font_size}" xml:space="preserve">{text}</text></svg>"#,
        family = escape_xml(family),
        text = escape_xml(text),
    );
    let opts = usvg::Options {
        fontdb: db,
        font_family: family.to_string(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(&svg, &opts).map_err(|e| RenderError::Measure(e.to_string()))?;
    // 找不到字体时 usvg 会丢弃整个 text 节点
    Ok(tree
        .root()
        .children()
        .iter()
        .find_map(|node| match node {
            usvg::Node::Text(text) => Some(text.bounding_box().width()),
            _ => None,
        })
        .unwrap_or(0.0))
}
