//! 插件层错误：汇总各组件错误，并映射为宿主协议错误码。
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use osu_galaxy_core::auth::CredentialsError;
use osu_galaxy_core::rpc::{codes, RpcError};
use osu_galaxy_local::LaunchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("未知游戏: {0}")]
    UnknownGame(String),
    #[error("序列化响应失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PluginError {
    /// 转换为协议错误对象。
    pub fn to_rpc(&self) -> RpcError {
        let code = match self {
            PluginError::Credentials(err) => match err {
                CredentialsError::InvalidCredentials(_) => codes::INVALID_CREDENTIALS,
                CredentialsError::MalformedRedirect(_) => codes::MALFORMED_REDIRECT,
                CredentialsError::NotAuthenticated => codes::NOT_AUTHENTICATED,
            },
            PluginError::Launch(_) => codes::LAUNCH_FAILED,
            PluginError::UnknownGame(_) => codes::UNKNOWN_GAME,
            PluginError::Serialize(_) => codes::INTERNAL_ERROR,
        };
        RpcError::new(code, self.to_string())
    }
}
