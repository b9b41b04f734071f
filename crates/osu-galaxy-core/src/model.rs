//! 插件对宿主暴露的数据模型：游戏条目、本地状态、认证结果。
//!
//! 约定：
//! - 字段名与宿主协议保持一致（snake_case），枚举值按宿主约定的 PascalCase 输出
//! - 本模块只定义数据结构，不执行任何 IO
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// 唯一支持的游戏 ID（同时用作显示名称）。
pub const OSU_GAME_ID: &str = "osu!";

/// 官方下载页（安装动作打开该地址）。
pub const OSU_DOWNLOAD_URL: &str = "https://osu.ppy.sh/home/download";

/// 授权类型。osu! 为免费游戏，目录中只会出现 `FreeToPlay`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseType {
    FreeToPlay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub license_type: LicenseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// 游戏目录条目。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: String,
    pub game_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dlcs: Option<Vec<String>>,
    pub license_info: LicenseInfo,
}

impl Game {
    /// osu! 的静态目录条目（不可变，无需授权校验）。
    pub fn osu() -> Self {
        Self {
            game_id: OSU_GAME_ID.to_string(),
            game_title: OSU_GAME_ID.to_string(),
            dlcs: None,
            license_info: LicenseInfo {
                license_type: LicenseType::FreeToPlay,
                owner: None,
            },
        }
    }
}

/// 本地游戏状态位集：{未安装, 已安装, 运行中}。
///
/// 序列化格式：
/// - 以整数位值传输（`None=0`、`Installed=1`、`Running=2`，可按位或组合）
///
/// 注意：
/// - `Running` 不隐含 `Installed`；探测结果为“运行中但未检测到安装”时原样上报
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalGameState(u8);

impl LocalGameState {
    pub const NONE: Self = Self(0);
    pub const INSTALLED: Self = Self(1);
    pub const RUNNING: Self = Self(2);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_installed(self) -> bool {
        self.contains(Self::INSTALLED)
    }

    pub const fn is_running(self) -> bool {
        self.contains(Self::RUNNING)
    }
}

impl BitOr for LocalGameState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LocalGameState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for LocalGameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_installed(), self.is_running()) {
            (false, false) => f.write_str("None"),
            (true, false) => f.write_str("Installed"),
            (false, true) => f.write_str("Running"),
            (true, true) => f.write_str("Installed|Running"),
        }
    }
}

/// 单个游戏的本地状态（上报给宿主）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalGame {
    pub game_id: String,
    pub local_game_state: LocalGameState,
}

impl LocalGame {
    pub fn osu(state: LocalGameState) -> Self {
        Self {
            game_id: OSU_GAME_ID.to_string(),
            local_game_state: state,
        }
    }
}

/// 认证成功结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub user_id: String,
    pub user_name: String,
}

/// 内嵌浏览器登录窗口参数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSessionParams {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub start_uri: String,
    pub end_uri_regex: String,
}

/// 要求宿主先完成一次内嵌浏览器交互的指令。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    /// 步骤类型，目前只有 `web_session`。
    pub next_step: String,
    pub auth_params: WebSessionParams,
}

/// `init_authentication` 的返回值：直接认证成功，或需要网页登录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AuthOutcome {
    Authenticated(Authentication),
    NextStep(NextStep),
}
