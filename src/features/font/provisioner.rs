use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use moka::future::Cache;
use resvg::usvg::fontdb;
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};

use crate::config::FontConfig;
use crate::error::FontLoadError;

use super::registry::FontRegistry;
use super::{FontResolver, ResolvedFont};

/// 缓存条目：本地文件 + 注册时使用的家族名
#[derive(Debug, Clone)]
pub struct FontEntry {
    pub path: PathBuf,
    pub family: String,
}

/// 按 URL 派生的家族名，保证不同来源的字体不会互相覆盖。
pub fn family_name_for(url: &str) -> String {
    format!("cover-font-{}", url_digest(url))
}

/// 临时文件名：URL 摘要 + 毫秒时间戳。
pub fn scratch_file_name(url: &str, unix_millis: i64) -> String {
    format!(
        "font-{}-{}.{}",
        url_digest(url),
        unix_millis,
        font_extension(url)
    )
}

fn url_digest(url: &str) -> String {
    let hash = Sha256::digest(url.as_bytes());
    hex::encode(&hash[..6])
}

fn font_extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".otf") {
        "otf"
    } else if lower.ends_with(".ttc") {
        "ttc"
    } else {
        "ttf"
    }
}

/// 远程字体获取与缓存服务。
///
/// 每个 URL 在进程生命周期内只下载一次：并发的首次请求由缓存合并为一次下载，
/// 之后直接复用本地文件与已注册的家族名。缓存没有淘汰策略。
pub struct FontProvisioner {
    client: Client,
    scratch_dir: PathBuf,
    max_bytes: u64,
    cache: Cache<String, FontEntry>,
    registry: Arc<FontRegistry>,
    written: Mutex<Vec<PathBuf>>,
    fetch_count: AtomicU64,
}

impl FontProvisioner {
    pub fn new(cfg: &FontConfig) -> Result<Self, reqwest::Error> {
        let client = crate::http::build_font_client(cfg)?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: Client, cfg: &FontConfig) -> Self {
        Self {
            client,
            scratch_dir: cfg.scratch_path(),
            max_bytes: cfg.max_bytes,
            cache: Cache::builder().build(),
            registry: Arc::new(FontRegistry::new()),
            written: Mutex::new(Vec::new()),
            fetch_count: AtomicU64::new(0),
        }
    }

    /// 确保 `url` 对应的字体已下载并注册，返回可用于渲染的家族名与注册表快照。
    pub async fn resolve(&self, url: &str) -> Result<ResolvedFont, FontLoadError> {
        if let Some(entry) = self.cache.get(url).await {
            if tokio::fs::try_exists(&entry.path).await.unwrap_or(false) {
                tracing::debug!("字体缓存命中: {} -> {}", url, entry.family);
                return Ok(self.resolved(entry));
            }
            tracing::warn!(
                "缓存的字体文件已丢失，重新下载: {} ({})",
                url,
                entry.path.display()
            );
            self.cache.invalidate(url).await;
        }

        let entry = self
            .cache
            .try_get_with(url.to_string(), self.provision(url))
            .await
            .map_err(|e| (*e).clone())?;
        Ok(self.resolved(entry))
    }

    fn resolved(&self, entry: FontEntry) -> ResolvedFont {
        ResolvedFont {
            family: entry.family,
            path: entry.path,
            database: self.registry.snapshot(),
        }
    }

    async fn provision(&self, url: &str) -> Result<FontEntry, FontLoadError> {
        let t0 = Instant::now();
        let parsed = Url::parse(url).map_err(|_| FontLoadError::InvalidUrl {
            url: url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FontLoadError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let bytes = self.download(parsed, url).await?;
        let t_fetch = t0.elapsed();

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| FontLoadError::from_io(url, e))?;
        let millis = chrono::Utc::now().timestamp_millis();
        let path = self.scratch_dir.join(scratch_file_name(url, millis));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| FontLoadError::from_io(url, e))?;

        let family = family_name_for(url);
        let size = bytes.len();
        match self.register(bytes, &family, url).await {
            Ok(faces) => {
                self.written
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(path.clone());
                tracing::info!(
                    "字体已注册: {} -> {} ({} faces, {} bytes, 下载={:?}, 总计={:?}) at {}",
                    url,
                    family,
                    faces,
                    size,
                    t_fetch,
                    t0.elapsed(),
                    path.display()
                );
                Ok(FontEntry { path, family })
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("清理失败的字体文件出错 {}: {}", path.display(), rm);
                }
                Err(e)
            }
        }
    }

    async fn download(&self, parsed: Url, url: &str) -> Result<Vec<u8>, FontLoadError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FontLoadError::from_reqwest(url, e))?;

        let too_large = || FontLoadError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };
        if resp.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FontLoadError::from_reqwest(url, e))?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    async fn register(&self, data: Vec<u8>, family: &str, url: &str) -> Result<usize, FontLoadError> {
        let registry = self.registry.clone();
        let family_owned = family.to_string();
        let faces = tokio::task::spawn_blocking(move || registry.register_bytes(data, &family_owned))
            .await
            .map_err(|e| FontLoadError::Io {
                url: url.to_string(),
                reason: format!("注册任务执行失败: {e}"),
            })?;

        if faces == 0 {
            return Err(FontLoadError::NotAFont {
                url: url.to_string(),
            });
        }
        Ok(faces)
    }

    /// 已触发的网络下载次数
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// 当前缓存的 URL 列表
    pub fn cached_urls(&self) -> Vec<String> {
        self.cache.iter().map(|(k, _)| k.as_ref().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.cache.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 已注册全部字体的只读快照
    pub fn snapshot(&self) -> Arc<fontdb::Database> {
        self.registry.snapshot()
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// 删除本进程写入的全部临时字体文件（退出时调用）。
    pub async fn purge_scratch(&self) -> usize {
        let paths: Vec<PathBuf> = std::mem::take(
            &mut *self.written.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let mut removed = 0;
        for path in paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("删除临时字体失败 {}: {}", path.display(), e),
            }
        }
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        removed
    }
}

impl FontResolver for FontProvisioner {
    fn resolve<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ResolvedFont, FontLoadError>> {
        Box::pin(FontProvisioner::resolve(self, url))
    }
}
