//! 进程状态检测（判断游戏是否正在运行）。
//!
//! 实现策略：
//! - 按可执行文件名匹配（忽略路径，ASCII 大小写不敏感）
//! - 游戏文件名足够独特；同名进程会被当作游戏进程
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use sysinfo::{ProcessRefreshKind, RefreshKind, System};

/// 判断是否存在指定名称的进程。
///
/// 参数：
/// - `exe_name`：可执行文件名（如 `osu!.exe`）
///
/// 返回值：
/// - `true`：检测到同名进程
/// - `false`：未检测到，或名称为空
pub fn is_process_running_by_name(exe_name: &str) -> bool {
    let needle = exe_name.to_ascii_lowercase();
    if needle.is_empty() {
        return false;
    }
    let mut system = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new()),
    );
    system.refresh_processes();
    system
        .processes()
        .values()
        .any(|p| p.name().to_ascii_lowercase() == needle)
}
