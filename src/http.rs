use reqwest::Client;

use crate::config::FontConfig;

/// 下载字体用的 HTTP Client。
///
/// - `Client` 内部带连接池，整个进程复用同一个实例；
/// - GitHub `raw` 地址会 302 到 CDN，保持 reqwest 默认的重定向策略。
pub fn build_font_client(cfg: &FontConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(cfg.fetch_timeout())
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
}
