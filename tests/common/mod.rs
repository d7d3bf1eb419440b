#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{Router, extract::State, http::StatusCode, routing::get};
use cover_backend::config::FontConfig;

/// 本地字体服务器：统计每条路由的访问次数
#[derive(Clone, Default)]
pub struct Hits {
    font: Arc<AtomicUsize>,
    garbage: Arc<AtomicUsize>,
}

impl Hits {
    pub fn font(&self) -> usize {
        self.font.load(Ordering::SeqCst)
    }

    pub fn garbage(&self) -> usize {
        self.garbage.load(Ordering::SeqCst)
    }
}

pub struct FontHost {
    pub addr: SocketAddr,
    pub hits: Hits,
}

impl FontHost {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

#[derive(Clone)]
struct HostState {
    hits: Hits,
    font: Arc<Vec<u8>>,
}

/// 路由：
/// - `/font.ttf`、`/other.ttf`：返回 `font_bytes`
/// - `/garbage.ttf`：返回非字体内容
/// - `/big.ttf`：返回 64 KiB 零字节
/// - 其余路径 404
pub async fn spawn_font_host(font_bytes: Vec<u8>) -> FontHost {
    let hits = Hits::default();
    let state = HostState {
        hits: hits.clone(),
        font: Arc::new(font_bytes),
    };

    async fn font(State(s): State<HostState>) -> Vec<u8> {
        s.hits.font.fetch_add(1, Ordering::SeqCst);
        s.font.as_ref().clone()
    }
    async fn garbage(State(s): State<HostState>) -> &'static str {
        s.hits.garbage.fetch_add(1, Ordering::SeqCst);
        "definitely not a font file"
    }
    async fn big() -> Vec<u8> {
        vec![0u8; 64 * 1024]
    }

    let app = Router::new()
        .route("/font.ttf", get(font))
        .route("/other.ttf", get(font))
        .route("/garbage.ttf", get(garbage))
        .route("/big.ttf", get(big))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind font host");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    FontHost { addr, hits }
}

/// 每个测试独立的临时目录
pub fn font_config() -> FontConfig {
    let dir = std::env::temp_dir().join(format!("cover-it-{}", uuid::Uuid::new_v4().simple()));
    FontConfig {
        scratch_dir: Some(dir.to_string_lossy().into_owned()),
        fetch_timeout_secs: 5,
        ..FontConfig::default()
    }
}

/// 随仓库提交的测试字体（Tuffy，公有领域，见 `tests/fixtures/Tuffy-LICENSE.txt`）
pub const FIXTURE_FONT: &[u8] = include_bytes!("../fixtures/Tuffy.ttf");

pub fn fixture_font() -> Vec<u8> {
    FIXTURE_FONT.to_vec()
}

/// 统计接近黑色的像素数量（白底黑字时即文字像素）
pub fn dark_pixels(rgba: &[u8]) -> usize {
    rgba.chunks_exact(4).filter(|p| p[0] < 64).count()
}

/// 解码 PNG，返回 (宽, 高, RGBA 像素)
pub fn decode_png(bytes: &[u8]) -> (u32, u32, Vec<u8>) {
    let decoder = png::Decoder::new(bytes);
    let mut reader = decoder.read_info().expect("png header");
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).expect("png frame");
    buf.truncate(info.buffer_size());
    (info.width, info.height, buf)
}
