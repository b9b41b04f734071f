//! 游戏安装位置约定与解析。
//!
//! 解析顺序（先命中者为准）：
//! 1) 显式指定的安装目录（命令行 `--install-dir` / 环境变量 `OSU_INSTALL_DIR`）
//! 2) Windows：注册表中 `osu` 协议处理程序指向的可执行文件
//! 3) 平台默认目录：`<本地数据目录>/osu!`
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::{Path, PathBuf};

/// 默认安装目录名。
pub const GAME_DIR: &str = "osu!";

/// 游戏可执行文件名（也用于进程名匹配）。
#[cfg(windows)]
pub const GAME_EXE: &str = "osu!.exe";
#[cfg(not(windows))]
pub const GAME_EXE: &str = "osu!";

/// 平台默认安装目录。
///
/// 返回值：
/// - Windows：`%LOCALAPPDATA%\osu!`
/// - 其他平台：`$XDG_DATA_HOME/osu!`（或 `~/.local/share/osu!`）
/// - 无法确定本地数据目录时返回 `None`
pub fn default_install_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(GAME_DIR))
}

/// 按解析顺序确定游戏可执行文件路径。
///
/// 参数：
/// - `override_dir`：显式指定的安装目录（优先级最高，不再回退）
pub fn resolve_exe(override_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = override_dir {
        return Some(dir.join(GAME_EXE));
    }
    #[cfg(windows)]
    {
        if let Some(exe) = crate::registry::protocol_handler_exe() {
            return Some(exe);
        }
    }
    default_install_dir().map(|d| d.join(GAME_EXE))
}

/// 从 shell 命令行中取出可执行文件路径。
///
/// 示例：
/// - `"C:\Games\osu!\osu!.exe" "%1"` → `C:\Games\osu!\osu!.exe`
/// - `C:\osu!\osu!.exe %1` → `C:\osu!\osu!.exe`
///
/// 返回值：
/// - 命令行为空或引号未闭合时返回 `None`
pub fn parse_command_exe(command: &str) -> Option<PathBuf> {
    let command = command.trim();
    let exe = if let Some(rest) = command.strip_prefix('"') {
        let end = rest.find('"')?;
        &rest[..end]
    } else {
        command.split_whitespace().next()?
    };
    if exe.is_empty() {
        return None;
    }
    Some(PathBuf::from(exe))
}
