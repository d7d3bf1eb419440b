use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use resvg::{render, usvg};
use tiny_skia::{Pixmap, Transform};
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;

use crate::config::RenderConfig;
use crate::error::{AppError, RenderError};
use crate::features::font::ResolvedFont;

use super::layout::{self, SvgTextMeasurer};
use super::types::RenderRequest;

/// 一次文字绘制：相对画布中心的偏移与不透明度。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPass {
    pub dx: f32,
    pub dy: f32,
    pub alpha: f32,
}

/// 无模糊：一次不透明绘制
pub const SOLID_PASSES: [TextPass; 1] = [TextPass {
    dx: 0.0,
    dy: 0.0,
    alpha: 1.0,
}];

/// 模糊：主体半透明 + 轻微偏移的淡影，模拟柔和的双重曝光
pub const BLUR_PASSES: [TextPass; 2] = [
    TextPass {
        dx: 0.0,
        dy: 0.0,
        alpha: 0.65,
    },
    TextPass {
        dx: 1.0,
        dy: 0.5,
        alpha: 0.18,
    },
];

/// 渲染结果
#[derive(Debug, Clone)]
pub struct RenderedCover {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub font_size: f32,
}

pub fn text_passes(blur: bool) -> &'static [TextPass] {
    if blur { &BLUR_PASSES } else { &SOLID_PASSES }
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn check_dimensions(req: &RenderRequest, cfg: &RenderConfig) -> Result<(), RenderError> {
    let ok = |v: u32| v >= 1 && v <= cfg.max_dimension;
    if ok(req.width) && ok(req.height) {
        Ok(())
    } else {
        Err(RenderError::InvalidDimensions {
            width: req.width.to_string(),
            height: req.height.to_string(),
            max: cfg.max_dimension,
        })
    }
}

/// 生成封面 SVG：整幅背景 + 居中文字（每个 pass 一个 `<text>`）。
pub fn compose_svg(req: &RenderRequest, family: &str, font_size: f32) -> String {
    let (w, h) = (req.width, req.height);
    let mut svg = String::with_capacity(1024);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let _ = write!(
        svg,
        r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{}" fill-opacity="{}"/>"#,
        req.bg_color.to_hex(),
        req.bg_color.opacity()
    );

    let cx = w as f32 / 2.0;
    let cy = h as f32 / 2.0;
    let family = escape_xml(family);
    let text = escape_xml(&req.text);
    for pass in text_passes(req.blur) {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="'{family}'" font-size="{font_size}" text-anchor="middle" dominant-baseline="central" fill="{}" fill-opacity="{}" xml:space="preserve">{text}</text>"#,
            cx + pass.dx,
            cy + pass.dy,
            req.text_color.to_hex(),
            req.text_color.opacity() * pass.alpha,
        );
    }
    svg.push_str("</svg>");
    svg
}

/// 完整渲染流程（同步，CPU 密集）：测量 → 排版 → 栅格化 → PNG 编码。
pub fn render_cover(
    req: &RenderRequest,
    font: &ResolvedFont,
    cfg: &RenderConfig,
) -> Result<RenderedCover, RenderError> {
    let t0 = Instant::now();
    check_dimensions(req, cfg)?;

    let measurer = SvgTextMeasurer::new(&req.text, &font.family, font.database.clone())?;
    let start = layout::initial_font_size(req.width, req.height);
    let fit = layout::fit_font_size(&measurer, req.width, start)?;
    let t_layout = t0.elapsed();

    let svg = compose_svg(req, &font.family, fit.size);
    let opts = usvg::Options {
        fontdb: font.database.clone(),
        font_family: font.family.clone(),
        shape_rendering: usvg::ShapeRendering::GeometricPrecision,
        text_rendering: if cfg.optimize_speed {
            usvg::TextRendering::OptimizeSpeed
        } else {
            usvg::TextRendering::OptimizeLegibility
        },
        ..Default::default()
    };
    let tree =
        usvg::Tree::from_str(&svg, &opts).map_err(|e| RenderError::Svg(e.to_string()))?;

    let mut pixmap = Pixmap::new(req.width, req.height).ok_or(RenderError::Pixmap {
        width: req.width,
        height: req.height,
    })?;
    render(&tree, Transform::default(), &mut pixmap.as_mut());
    let t_raster = t0.elapsed();

    let png = encode_png(&pixmap, cfg.optimize_speed)?;
    let t_encode = t0.elapsed();

    tracing::debug!(
        "封面渲染分段: 排版={:?} (字号 {} -> {}, {} 步), 栅格化={:?}, 编码={:?}, 总计={:?}",
        t_layout,
        start,
        fit.size,
        fit.steps,
        t_raster - t_layout,
        t_encode - t_raster,
        t_encode
    );

    Ok(RenderedCover {
        png,
        width: req.width,
        height: req.height,
        font_size: fit.size,
    })
}

/// tiny-skia 内部为预乘 RGBA，写 PNG 前先还原为直通 alpha。
fn encode_png(pixmap: &Pixmap, optimize_speed: bool) -> Result<Vec<u8>, RenderError> {
    let (w, h) = (pixmap.width(), pixmap.height());
    let mut rgba = Vec::with_capacity((w * h * 4) as usize);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let mut out = Vec::with_capacity(rgba.len() / 4);
    {
        let mut encoder = png::Encoder::new(&mut out, w, h);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if optimize_speed {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::FilterType::NoFilter);
        } else {
            encoder.set_compression(png::Compression::Default);
            encoder.set_filter(png::FilterType::Paeth);
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderError::Encode(format!("write_header: {e}")))?;
        writer
            .write_image_data(&rgba)
            .map_err(|e| RenderError::Encode(format!("write_image_data: {e}")))?;
        writer
            .finish()
            .map_err(|e| RenderError::Encode(format!("finish: {e}")))?;
    }
    Ok(out)
}

/// PNG 字节编码为可直接放进 `<img src>` 的 data URL。
pub fn to_data_url(png: &[u8]) -> String {
    let mut url = String::with_capacity(22 + png.len().div_ceil(3) * 4);
    url.push_str("data:image/png;base64,");
    BASE64_STANDARD.encode_string(png, &mut url);
    url
}

/// 异步渲染入口：受信号量限流，并在阻塞线程池中执行，避免占用运行时线程。
pub async fn render_cover_async(
    req: RenderRequest,
    font: ResolvedFont,
    cfg: Arc<RenderConfig>,
    semaphore: Arc<Semaphore>,
) -> Result<RenderedCover, AppError> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal(format!("渲染信号量已关闭: {e}")))?;

    spawn_blocking(move || render_cover(&req, &font, &cfg))
        .await
        .map_err(|e| AppError::Internal(format!("阻塞渲染任务执行失败: {e}")))?
        .map_err(AppError::from)
}
