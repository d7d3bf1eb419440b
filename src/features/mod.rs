/// 文字封面：参数校验、排版与渲染
pub mod cover;
/// 远程字体下载、缓存与注册
pub mod font;
/// 健康检查
pub mod health;
/// 首页表单
pub mod ui;
