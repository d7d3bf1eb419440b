use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 全局配置单例（仅二进制入口使用；库内组件均显式接收配置）
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 默认字体（Montserrat Bold）
pub const DEFAULT_FONT_URL: &str =
    "https://github.com/google/fonts/raw/main/ofl/montserrat/Montserrat-Bold.ttf";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 默认日志过滤（RUST_LOG 优先）
    pub level: String,
    /// 日志格式：full | compact
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "cover_backend=info,tower_http=info".to_string(),
            format: "full".to_string(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api".to_string(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_origins")]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_methods")]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    fn default_methods() -> Vec<String> {
        vec!["GET".to_string()]
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Self::default_origins(),
            allowed_methods: Self::default_methods(),
            allowed_headers: Vec::new(),
            max_age_secs: None,
        }
    }
}

/// 字体获取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// 请求未携带 fontUrl 时使用的字体
    #[serde(default = "FontConfig::default_url")]
    pub default_url: String,
    /// 下载字体的临时目录（缺省为系统临时目录下的 cover-fonts）
    #[serde(default)]
    pub scratch_dir: Option<String>,
    /// 下载超时（秒）
    #[serde(default = "FontConfig::default_timeout")]
    pub fetch_timeout_secs: u64,
    /// 单个字体文件的大小上限（字节）
    #[serde(default = "FontConfig::default_max_bytes")]
    pub max_bytes: u64,
}

impl FontConfig {
    fn default_url() -> String {
        DEFAULT_FONT_URL.to_string()
    }
    fn default_timeout() -> u64 {
        30
    }
    fn default_max_bytes() -> u64 {
        20 * 1024 * 1024
    }

    /// 解析后的临时目录
    pub fn scratch_path(&self) -> PathBuf {
        match self.scratch_dir.as_deref() {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => std::env::temp_dir().join("cover-fonts"),
        }
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            default_url: Self::default_url(),
            scratch_dir: None,
            fetch_timeout_secs: Self::default_timeout(),
            max_bytes: Self::default_max_bytes(),
        }
    }
}

/// 封面渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// 默认画布宽度
    #[serde(default = "RenderConfig::default_width")]
    pub default_width: u32,
    /// 默认画布高度
    #[serde(default = "RenderConfig::default_height")]
    pub default_height: u32,
    /// 宽高上限（防止超大画布耗尽内存）
    #[serde(default = "RenderConfig::default_max_dimension")]
    pub max_dimension: u32,
    /// 是否优先速度（PNG 快速压缩、无滤波）
    #[serde(default)]
    pub optimize_speed: bool,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
}

impl RenderConfig {
    fn default_width() -> u32 {
        600
    }
    fn default_height() -> u32 {
        600
    }
    fn default_max_dimension() -> u32 {
        4096
    }

    /// 实际生效的并发许可数
    pub fn parallelism(&self) -> usize {
        if self.max_parallel == 0 {
            num_cpus::get()
        } else {
            self.max_parallel as usize
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_width: Self::default_width(),
            default_height: Self::default_height(),
            max_dimension: Self::default_max_dimension(),
            optimize_speed: false,
            max_parallel: 0,
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 字体获取配置
    #[serde(default)]
    pub font: FontConfig,
    /// 封面渲染配置
    #[serde(default)]
    pub render: RenderConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置（文件可缺省），支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            // 环境变量覆盖，例如：APP_SERVER__PORT=8080、APP_FONT__MAX_BYTES=1048576
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<&'static AppConfig, ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(Self::global())
    }

    /// 获取配置文件路径（可由 APP_CONFIG_FILE 指定）
    fn get_config_path() -> PathBuf {
        std::env::var("APP_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_public_endpoint() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.render.default_width, 600);
        assert_eq!(cfg.render.default_height, 600);
        assert_eq!(cfg.font.default_url, DEFAULT_FONT_URL);
        assert_eq!(cfg.api.prefix, "/api");
        assert!(cfg.cors.enabled);
        assert_eq!(cfg.cors.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: AppConfig = ConfigBuilder::builder()
            .add_source(File::from_str(
                "[render]\ndefault_height = 400\n[font]\nscratch_dir = \"/tmp/x\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .expect("build config")
            .try_deserialize()
            .expect("deserialize config");
        assert_eq!(cfg.render.default_height, 400);
        assert_eq!(cfg.render.default_width, 600);
        assert_eq!(cfg.font.scratch_path(), PathBuf::from("/tmp/x"));
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn blank_scratch_dir_uses_temp_dir() {
        let font = FontConfig {
            scratch_dir: Some("  ".to_string()),
            ..FontConfig::default()
        };
        assert_eq!(
            font.scratch_path(),
            std::env::temp_dir().join("cover-fonts")
        );
    }

    #[test]
    fn parallelism_zero_means_cpu_count() {
        let render = RenderConfig::default();
        assert!(render.parallelism() >= 1);
        let fixed = RenderConfig {
            max_parallel: 3,
            ..RenderConfig::default()
        };
        assert_eq!(fixed.parallelism(), 3);
    }
}
