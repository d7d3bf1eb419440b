use std::fs;
use std::path::Path;

use crate::config::AppConfig;
use crate::error::AppError;

/// 执行启动检查
///
/// 1. 校验渲染与接口配置
/// 2. 创建字体临时目录并确认可写
pub async fn run_startup_checks(config: &AppConfig) -> Result<(), AppError> {
    tracing::info!("🔍 开始执行启动检查...");

    validate_config(config)?;

    let scratch = config.font.scratch_path();
    tokio::task::spawn_blocking(move || ensure_scratch_dir(&scratch))
        .await
        .map_err(|e| AppError::Internal(format!("启动检查任务失败: {e}")))??;

    tracing::info!("✅ 启动检查完成");
    Ok(())
}

fn validate_config(config: &AppConfig) -> Result<(), AppError> {
    let render = &config.render;
    if render.max_dimension == 0 {
        return Err(AppError::Internal("render.max_dimension 必须大于 0".into()));
    }
    for (name, value) in [
        ("render.default_width", render.default_width),
        ("render.default_height", render.default_height),
    ] {
        if value == 0 || value > render.max_dimension {
            return Err(AppError::Internal(format!(
                "{name}={value} 超出 1..={} 范围",
                render.max_dimension
            )));
        }
    }

    let prefix = &config.api.prefix;
    if !prefix.starts_with('/') || prefix.ends_with('/') {
        return Err(AppError::Internal(format!(
            "api.prefix 必须以 / 开头且不能以 / 结尾: {:?}",
            config.api.prefix
        )));
    }

    match reqwest::Url::parse(&config.font.default_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        _ => {
            return Err(AppError::Internal(format!(
                "font.default_url 不是有效的 http(s) 地址: {}",
                config.font.default_url
            )));
        }
    }

    if config.font.max_bytes == 0 {
        tracing::warn!("⚠️ font.max_bytes=0，所有字体下载都会被拒绝");
    }
    Ok(())
}

/// 确保字体临时目录存在且可写
fn ensure_scratch_dir(dir: &Path) -> Result<(), AppError> {
    if !dir.exists() {
        tracing::info!("📁 创建字体临时目录: {:?}", dir);
        fs::create_dir_all(dir)
            .map_err(|e| AppError::Internal(format!("创建字体临时目录失败 {dir:?}: {e}")))?;
    }

    let probe = dir.join(format!(".write-probe-{}", std::process::id()));
    fs::write(&probe, b"ok")
        .map_err(|e| AppError::Internal(format!("字体临时目录不可写 {dir:?}: {e}")))?;
    if let Err(e) = fs::remove_file(&probe) {
        tracing::warn!("清理写入探针失败 {:?}: {}", probe, e);
    }

    tracing::info!("✅ 字体临时目录可用: {:?}", dir);
    Ok(())
}
