//! 注册表读取：通过 `osu` 协议处理程序定位已安装的游戏。
//!
//! osu! 安装时会注册 `osu://` 协议，其 `shell\open\command` 默认值指向游戏可执行文件。
//!
//! 权限要求：
//! - 仅读取 HKCU / HKCR，无需管理员权限
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::PathBuf;

use tracing::debug;
use winreg::enums::{HKEY_CLASSES_ROOT, HKEY_CURRENT_USER};
use winreg::RegKey;

use crate::paths::parse_command_exe;

/// 读取 `osu` 协议处理程序的可执行文件路径。
///
/// 返回值：
/// - 找到且命令行可解析：返回可执行文件路径（不检查文件是否存在）
/// - 键/值不存在或无法解析：返回 `None`
pub fn protocol_handler_exe() -> Option<PathBuf> {
    // 当前用户注册优先，其次是合并视图 HKCR。
    let candidates = [
        (HKEY_CURRENT_USER, "Software\\Classes\\osu\\shell\\open\\command"),
        (HKEY_CLASSES_ROOT, "osu\\shell\\open\\command"),
    ];
    for (hive, key) in candidates {
        let command: std::io::Result<String> = RegKey::predef(hive)
            .open_subkey(key)
            .and_then(|k| k.get_value(""));
        match command {
            Ok(cmd) => {
                if let Some(exe) = parse_command_exe(&cmd) {
                    return Some(exe);
                }
                debug!("无法解析 osu 协议命令行: {cmd}");
            }
            Err(e) => debug!("读取注册表失败: {key}: {e}"),
        }
    }
    None
}
