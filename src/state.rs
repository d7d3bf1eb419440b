use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::{AppConfig, FontConfig, RenderConfig};
use crate::features::font::FontResolver;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 字体解析（生产环境为 `FontProvisioner`）
    pub fonts: Arc<dyn FontResolver>,
    pub font: Arc<FontConfig>,
    pub render: Arc<RenderConfig>,
    /// 业务接口前缀（首页表单据此拼接请求地址）
    pub api_prefix: Arc<str>,
    /// 控制并发渲染的信号量（限制 CPU 密集型任务数量）
    pub render_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: &AppConfig, fonts: Arc<dyn FontResolver>) -> Self {
        Self {
            fonts,
            font: Arc::new(config.font.clone()),
            render: Arc::new(config.render.clone()),
            api_prefix: Arc::from(config.api.prefix.as_str()),
            render_semaphore: Arc::new(Semaphore::new(config.render.parallelism())),
        }
    }
}
