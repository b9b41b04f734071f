//! 宿主协议定义（请求/响应/通知）。
//!
//! 协议形态：
//! - 以 JSON-RPC 2.0 结构传输，按“单行一条消息”的方式收发
//! - 宿主请求携带 `id`，插件按相同 `id` 回复；不带 `id` 的消息视为通知，不回复
//! - 插件主动发送的消息只有两类通知：`store_credentials`、`local_game_status_changed`
//!
//! 约束与注意事项：
//! - 错误消息 `message` 不应包含令牌明文
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::Credentials;
use crate::model::LocalGame;

const JSONRPC_VERSION: &str = "2.0";

/// 错误码。
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const INVALID_CREDENTIALS: i32 = 100;
    pub const MALFORMED_REDIRECT: i32 = 101;
    pub const NOT_AUTHENTICATED: i32 = 102;
    pub const LAUNCH_FAILED: i32 = 103;
    pub const UNKNOWN_GAME: i32 = 104;
}

/// 收到的原始消息信封。
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// 错误对象。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// 发往宿主的响应。
///
/// 说明：
/// - 成功时 `result` 可以是 `null`，此时仍会输出 `"result": null`
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// 插件发往宿主的通知。
#[derive(Debug, Clone, Serialize)]
pub struct RpcNotification {
    jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Value,
}

impl RpcNotification {
    /// 请求宿主持久化凭据，下次启动时通过 `init_authentication` 回传。
    pub fn store_credentials(credentials: &Credentials) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: "store_credentials",
            params: serde_json::json!({ "credentials": credentials }),
        }
    }

    /// 通知宿主本地游戏状态发生变化。
    pub fn local_game_status_changed(local_game: &LocalGame) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: "local_game_status_changed",
            params: serde_json::json!({ "local_game": local_game }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitAuthenticationParams {
    #[serde(default)]
    pub stored_credentials: Option<Credentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginCredentials {
    pub end_uri: String,
}

/// 浏览器会话 Cookie（插件目前只记录数量，不使用内容）。
#[derive(Debug, Clone, Deserialize)]
pub struct Cookie {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PassLoginCredentialsParams {
    #[serde(default)]
    pub step: Option<String>,
    pub credentials: LoginCredentials,
    #[serde(default)]
    pub cookies: Vec<Cookie>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameIdParams {
    pub game_id: String,
}

/// `get_capabilities` 的返回值。
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub platform_name: String,
    pub plugin_version: String,
    pub features: Vec<&'static str>,
    pub token: String,
}

/// 已解析的宿主调用。
#[derive(Debug, Clone)]
pub enum HostCall {
    GetCapabilities,
    InitAuthentication(InitAuthenticationParams),
    PassLoginCredentials(PassLoginCredentialsParams),
    ImportOwnedGames,
    ImportLocalGames,
    InstallGame(GameIdParams),
    LaunchGame(GameIdParams),
    Ping,
    Shutdown,
}

impl HostCall {
    /// 按方法名解析参数。
    ///
    /// 异常处理：
    /// - 未知方法：`METHOD_NOT_FOUND`
    /// - 参数结构不符：`INVALID_PARAMS`
    ///
    /// 说明：
    /// - 参数缺失（`null`）时，无参方法正常解析，有参方法按空对象处理
    pub fn parse(method: &str, params: Value) -> Result<Self, RpcError> {
        let params = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };
        Ok(match method {
            "get_capabilities" => HostCall::GetCapabilities,
            "init_authentication" => HostCall::InitAuthentication(typed(params)?),
            "pass_login_credentials" => HostCall::PassLoginCredentials(typed(params)?),
            "import_owned_games" => HostCall::ImportOwnedGames,
            "import_local_games" => HostCall::ImportLocalGames,
            "install_game" => HostCall::InstallGame(typed(params)?),
            "launch_game" => HostCall::LaunchGame(typed(params)?),
            "ping" => HostCall::Ping,
            "shutdown" => HostCall::Shutdown,
            other => {
                return Err(RpcError::new(
                    codes::METHOD_NOT_FOUND,
                    format!("unknown method: {other}"),
                ))
            }
        })
    }
}

fn typed<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params)
        .map_err(|e| RpcError::new(codes::INVALID_PARAMS, format!("invalid params: {e}")))
}
