//! 游戏进程启动与退出等待。
//!
//! 说明：
//! - 启动失败（文件不存在、系统拒绝执行）以 [`LaunchError`] 返回
//! - 进程退出（包括非零退出码）不视为错误，只记录日志
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// 启动错误。
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("未找到游戏可执行文件: {}", .0.display())]
    NotFound(PathBuf),
    #[error("启动游戏失败: {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 已启动的游戏进程句柄。
///
/// 注意：
/// - 句柄被丢弃时不会结束子进程
#[derive(Debug)]
pub struct LaunchHandle {
    child: Child,
    exe: PathBuf,
}

impl LaunchHandle {
    /// 子进程 PID（进程已被回收时为 `None`）。
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// 挂起直到子进程退出；该调用是启动流程中唯一的等待点。
    pub async fn wait(mut self) {
        match self.child.wait().await {
            Ok(status) => info!("游戏进程已退出: {} ({status})", self.exe.display()),
            Err(e) => warn!("等待游戏进程失败: {}: {e}", self.exe.display()),
        }
    }
}

/// 启动指定可执行文件，工作目录设为其所在目录。
///
/// 异常处理：
/// - 文件不存在：[`LaunchError::NotFound`]
/// - 进程创建失败（权限、格式不支持等）：[`LaunchError::Spawn`]
///
/// 注意：
/// - 需在 Tokio 运行时内调用
pub fn spawn(exe: &Path) -> Result<LaunchHandle, LaunchError> {
    if !exe.is_file() {
        return Err(LaunchError::NotFound(exe.to_path_buf()));
    }
    let mut cmd = Command::new(exe);
    if let Some(dir) = exe.parent().filter(|d| !d.as_os_str().is_empty()) {
        cmd.current_dir(dir);
    }
    let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
        path: exe.to_path_buf(),
        source,
    })?;
    info!("游戏进程已启动: {} (pid={:?})", exe.display(), child.id());
    Ok(LaunchHandle {
        child,
        exe: exe.to_path_buf(),
    })
}
