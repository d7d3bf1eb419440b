pub mod provisioner;
pub mod registry;

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use resvg::usvg::fontdb;

use crate::error::FontLoadError;

pub use provisioner::{FontEntry, FontProvisioner, family_name_for, scratch_file_name};
pub use registry::FontRegistry;

/// 已就绪的字体：渲染时按 `family` 在 `database` 中查找字形。
#[derive(Debug, Clone)]
pub struct ResolvedFont {
    pub family: String,
    pub path: PathBuf,
    pub database: Arc<fontdb::Database>,
}

/// 字体解析入口。
///
/// 处理器只依赖该 trait，测试可以替换为不访问网络的实现。
pub trait FontResolver: Send + Sync {
    fn resolve<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ResolvedFont, FontLoadError>>;
}
