//! 在系统默认浏览器中打开网页。
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

/// 打开指定地址（不等待浏览器进程）。
///
/// 异常处理：
/// - 找不到可用的打开方式时返回 IO 错误；调用方按“尽力而为”处理
pub fn open_url(url: &str) -> std::io::Result<()> {
    open::that_detached(url)
}
