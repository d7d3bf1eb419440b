use std::sync::Arc;

use cover_backend::config::LoggingConfig;
use cover_backend::features::font::FontProvisioner;
use cover_backend::startup::run_startup_checks;
use cover_backend::{AppConfig, AppState, ShutdownManager, build_app};
use tracing_subscriber::EnvFilter;

/// RUST_LOG 优先，其次为配置文件中的 `logging.level`。
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("compact") {
        builder.compact().init();
    } else {
        builder.init();
    }
}

fn server_result(res: Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<(), String> {
    match res {
        Ok(inner) => inner.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::init_global() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config init failed: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging);

    // 创建优雅退出管理器并启动信号处理器
    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run_startup_checks(config).await {
        tracing::error!("Startup checks failed: {}", e);
        std::process::exit(1);
    }

    let provisioner = match FontProvisioner::new(&config.font) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            tracing::error!("Font HTTP client init failed: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(config, provisioner.clone());
    let app = build_app(config, state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Generate API: http://{}{}/generate", addr, config.api.prefix);
    tracing::info!("字体临时目录: {:?}", provisioner.scratch_dir());

    let manager = shutdown_manager.clone();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    let shutdown_timeout = config.shutdown.timeout_duration();
    let mut server = tokio::spawn(async move { graceful.await });
    let result = tokio::select! {
        res = &mut server => server_result(res),
        _ = shutdown_manager.wait_for_shutdown() => {
            // 退出信号之后，在途请求最多再等待 shutdown.timeout_secs
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(res) => server_result(res),
                Err(_) => {
                    tracing::warn!("优雅退出超时（{}秒），强制退出", config.shutdown.timeout_secs);
                    server.abort();
                    Ok(())
                }
            }
        }
    };

    let removed = provisioner.purge_scratch().await;
    tracing::info!("已清理 {} 个临时字体文件", removed);

    if let Err(e) = result {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }
    tracing::info!("服务器已优雅关闭");
}
