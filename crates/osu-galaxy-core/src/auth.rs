//! 凭据与身份：OAuth 重定向解析、凭据加载与身份推导。
//!
//! 凭据格式：
//! - 以 URL 查询串（`key=value&key=value`）形式携带，重复键收集为列表，空值丢弃
//! - 必需字段：`access_token`、`token_type`
//! - 宿主持久化时按 JSON 对象保存；重新加载时每个字段既可以是字符串，也可以是字符串数组
//!
//! 身份推导规则（按优先级）：
//! - `user_id`：凭据中的 `user_id` 字段 → access_token（JWT）中的 `sub` 声明 → 令牌摘要
//! - `user_name`：凭据中的 `username` 字段 → `user_id`
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::model::Authentication;

const ACCESS_TOKEN: &str = "access_token";
const TOKEN_TYPE: &str = "token_type";
const USER_ID: &str = "user_id";
const USER_NAME: &str = "username";

/// 凭据相关错误。
///
/// 用途：
/// - 由插件层映射为宿主可识别的错误码（见 `rpc::codes`）。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    /// 已保存的凭据缺少必需字段，宿主应重新发起无凭据的认证。
    #[error("已保存的凭据无效：缺少字段 {0}")]
    InvalidCredentials(&'static str),
    /// OAuth 重定向中没有可用的 Bearer 令牌。
    #[error("OAuth 重定向无效：{0}")]
    MalformedRedirect(&'static str),
    /// 尚未认证就读取身份信息。
    #[error("尚未完成认证")]
    NotAuthenticated,
}

/// 令牌字段集合（键 → 值列表）。
///
/// 说明：
/// - 内部使用 `BTreeMap`，序列化结果的键顺序稳定，便于宿主落盘与比对
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, Vec<String>>);

impl Credentials {
    /// 解析 URL 查询串（不含 `?`）。
    ///
    /// 行为：
    /// - 按 `application/x-www-form-urlencoded` 规则解码
    /// - 重复键按出现顺序收集为列表；值为空的键被忽略
    pub fn from_query(query: &str) -> Self {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            fields
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        Self(fields)
    }

    /// 读取某字段的第一个值。
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// 读取某字段的全部值。
    pub fn all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

}

impl FromIterator<(String, String)> for Credentials {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in iter {
            fields.entry(key).or_default().push(value);
        }
        Self(fields)
    }
}

/// 宿主回传的单个凭据字段：兼容字符串与字符串数组两种形态。
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredValue {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for Credentials {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, StoredValue>::deserialize(deserializer)?;
        let fields = raw
            .into_iter()
            .map(|(key, value)| {
                let values = match value {
                    StoredValue::One(v) => vec![v],
                    StoredValue::Many(vs) => vs,
                };
                (key, values)
            })
            .collect();
        Ok(Self(fields))
    }
}

/// 已认证用户身份。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
}

impl From<&Identity> for Authentication {
    fn from(identity: &Identity) -> Self {
        Authentication {
            user_id: identity.user_id.clone(),
            user_name: identity.user_name.clone(),
        }
    }
}

/// 当前会话：凭据与由其推导出的身份总是一起替换。
#[derive(Debug, Clone)]
struct Session {
    credentials: Credentials,
    identity: Identity,
}

/// 远端身份客户端：持有 Bearer 令牌并提供身份访问器。
///
/// 说明：
/// - 本组件不做任何网络请求，身份完全由凭据字段推导
/// - 单写者：只有认证流程会修改内部状态
#[derive(Debug, Default)]
pub struct IdentityClient {
    session: Option<Session>,
}

impl IdentityClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加载宿主之前保存的凭据。
    ///
    /// 异常处理：
    /// - `access_token` 或 `token_type` 缺失/为空时返回 [`CredentialsError::InvalidCredentials`]，
    ///   此时原有会话保持不变
    pub fn load_credentials(
        &mut self,
        stored: Credentials,
    ) -> Result<&Identity, CredentialsError> {
        let token = non_empty(&stored, ACCESS_TOKEN)
            .ok_or(CredentialsError::InvalidCredentials(ACCESS_TOKEN))?;
        non_empty(&stored, TOKEN_TYPE).ok_or(CredentialsError::InvalidCredentials(TOKEN_TYPE))?;
        let identity = derive_identity(&stored, token);
        Ok(self.install(stored, identity))
    }

    /// 从 OAuth 重定向的查询串设置凭据。
    ///
    /// 参数：
    /// - `query`：重定向 URL 中 `?` 之后的部分
    ///
    /// 异常处理：
    /// - 缺少 `access_token`，或 `token_type` 不是 `Bearer`（大小写不敏感）时返回
    ///   [`CredentialsError::MalformedRedirect`]
    pub fn set_credentials_from_redirect(
        &mut self,
        query: &str,
    ) -> Result<&Identity, CredentialsError> {
        let parsed = Credentials::from_query(query);
        let token = non_empty(&parsed, ACCESS_TOKEN)
            .ok_or(CredentialsError::MalformedRedirect("缺少 access_token"))?;
        let token_type = parsed
            .first(TOKEN_TYPE)
            .ok_or(CredentialsError::MalformedRedirect("缺少 token_type"))?;
        if !token_type.eq_ignore_ascii_case("bearer") {
            return Err(CredentialsError::MalformedRedirect("token_type 不是 Bearer"));
        }
        let identity = derive_identity(&parsed, token);
        Ok(self.install(parsed, identity))
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn identity(&self) -> Result<&Identity, CredentialsError> {
        self.session
            .as_ref()
            .map(|s| &s.identity)
            .ok_or(CredentialsError::NotAuthenticated)
    }

    pub fn user_id(&self) -> Result<&str, CredentialsError> {
        Ok(self.identity()?.user_id.as_str())
    }

    pub fn user_name(&self) -> Result<&str, CredentialsError> {
        Ok(self.identity()?.user_name.as_str())
    }

    pub fn credentials(&self) -> Result<&Credentials, CredentialsError> {
        self.session
            .as_ref()
            .map(|s| &s.credentials)
            .ok_or(CredentialsError::NotAuthenticated)
    }

    fn install(&mut self, credentials: Credentials, identity: Identity) -> &Identity {
        debug!(user_id = %identity.user_id, "凭据已更新");
        &self.session.insert(Session { credentials, identity }).identity
    }
}

fn non_empty<'a>(creds: &'a Credentials, key: &str) -> Option<&'a str> {
    creds.first(key).filter(|v| !v.trim().is_empty())
}

/// 按优先级推导身份（见模块文档）。
fn derive_identity(creds: &Credentials, token: &str) -> Identity {
    let user_id = creds
        .first(USER_ID)
        .map(str::to_owned)
        .or_else(|| jwt_subject(token))
        .unwrap_or_else(|| token_fingerprint(token));
    let user_name = creds
        .first(USER_NAME)
        .map(str::to_owned)
        .unwrap_or_else(|| user_id.clone());
    Identity { user_id, user_name }
}

#[derive(Deserialize)]
struct JwtClaims {
    #[serde(default)]
    sub: Option<serde_json::Value>,
}

/// 读取 JWT 载荷中的 `sub` 声明（不验签，仅用于展示身份）。
fn jwt_subject(token: &str) -> Option<String> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: JwtClaims = serde_json::from_slice(&bytes).ok()?;
    match claims.sub? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 不透明令牌的稳定标识：SHA-256 前 8 字节的十六进制。
fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let hex: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("osu-{hex}")
}
