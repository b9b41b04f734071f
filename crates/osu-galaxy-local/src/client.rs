//! 本地客户端：组合安装检测、运行检测与启动。
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::PathBuf;

use tracing::debug;

use crate::launch::{self, LaunchError, LaunchHandle};
use crate::paths::{self, GAME_EXE};
use crate::process;

/// 本地状态探测器。
///
/// 说明：
/// - 只保存显式指定的安装目录；实际路径在每次查询时重新解析
#[derive(Debug, Clone, Default)]
pub struct LocalClient {
    install_dir: Option<PathBuf>,
}

impl LocalClient {
    /// 创建探测器。
    ///
    /// 参数：
    /// - `install_dir`：显式安装目录；为 `None` 时按注册表/默认目录解析
    pub fn new(install_dir: Option<PathBuf>) -> Self {
        Self { install_dir }
    }

    /// 当前解析出的游戏可执行文件路径。
    pub fn exe_path(&self) -> Option<PathBuf> {
        paths::resolve_exe(self.install_dir.as_deref())
    }

    /// 游戏是否已安装（可执行文件存在即视为已安装）。
    pub fn is_installed(&self) -> bool {
        let installed = self.exe_path().is_some_and(|p| p.is_file());
        debug!(installed, "安装检测");
        installed
    }

    /// 游戏是否正在运行。
    pub fn is_running(&self) -> bool {
        let exe_name = self
            .exe_path()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| GAME_EXE.to_string());
        process::is_process_running_by_name(&exe_name)
    }

    /// 启动游戏。
    ///
    /// 异常处理：
    /// - 无法确定安装位置或可执行文件不存在：[`LaunchError::NotFound`]
    /// - 系统拒绝启动：[`LaunchError::Spawn`]
    pub fn launch(&self) -> Result<LaunchHandle, LaunchError> {
        let exe = self
            .exe_path()
            .ok_or_else(|| LaunchError::NotFound(PathBuf::from(GAME_EXE)))?;
        launch::spawn(&exe)
    }
}
