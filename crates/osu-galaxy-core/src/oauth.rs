//! OAuth 网页登录流程：授权起始地址与完成地址匹配规则。
//!
//! 流程：
//! 1) 宿主在内嵌浏览器中打开 `start_uri`（授权端点，`response_type=token`）
//! 2) 浏览器导航到的地址与 `end_uri_regex` 匹配时，宿主把该地址回传给插件
//! 3) 插件从地址的查询串中解析 Bearer 令牌（见 [`crate::auth`]）
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{NextStep, WebSessionParams};

pub const DEFAULT_AUTHORIZE_URL: &str = "https://osu.ppy.sh/oauth/authorize";
pub const DEFAULT_REDIRECT_URL: &str = "https://localhost/osu-galaxy/callback";
pub const DEFAULT_SCOPE: &str = "identify public";

const WINDOW_TITLE: &str = "Login to osu!";
const WINDOW_WIDTH: u32 = 570;
const WINDOW_HEIGHT: u32 = 700;

/// OAuth 端点配置（来自 manifest.json 的 `oauth` 段，缺省字段使用默认值）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthEndpoints {
    /// 授权端点。
    pub authorize_url: String,
    /// 重定向地址（登录完成后浏览器导航到的地址，不含查询串）。
    pub redirect_url: String,
    /// OAuth 客户端 ID。
    pub client_id: String,
    /// 申请的权限范围（空格分隔）。
    pub scope: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            client_id: String::new(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

/// 已校验的登录流程参数（启动时构建一次）。
#[derive(Debug, Clone)]
pub struct LoginFlow {
    start_uri: String,
    end_uri_regex: Regex,
}

impl LoginFlow {
    /// 根据端点配置构建登录流程。
    ///
    /// 异常处理：
    /// - 授权端点不是合法 URL 时返回错误
    /// - 完成匹配规则编译失败时返回错误（理论上不会发生：重定向地址已转义）
    pub fn from_endpoints(endpoints: &OAuthEndpoints) -> Result<Self> {
        let start = Url::parse_with_params(
            &endpoints.authorize_url,
            &[
                ("client_id", endpoints.client_id.as_str()),
                ("redirect_uri", endpoints.redirect_url.as_str()),
                ("response_type", "token"),
                ("scope", endpoints.scope.as_str()),
            ],
        )
        .with_context(|| format!("授权端点地址无效: {}", endpoints.authorize_url))?;

        let pattern = completion_pattern(&endpoints.redirect_url);
        let end_uri_regex =
            Regex::new(&pattern).with_context(|| format!("编译登录完成匹配规则失败: {pattern}"))?;

        Ok(Self {
            start_uri: start.into(),
            end_uri_regex,
        })
    }

    pub fn start_uri(&self) -> &str {
        &self.start_uri
    }

    pub fn end_uri_regex(&self) -> &str {
        self.end_uri_regex.as_str()
    }

    /// 判断浏览器导航地址是否表示登录完成。
    pub fn is_completion(&self, uri: &str) -> bool {
        self.end_uri_regex.is_match(uri)
    }

    /// 生成交给宿主的网页登录指令。
    pub fn next_step(&self) -> NextStep {
        NextStep {
            next_step: "web_session".to_string(),
            auth_params: WebSessionParams {
                window_title: WINDOW_TITLE.to_string(),
                window_width: WINDOW_WIDTH,
                window_height: WINDOW_HEIGHT,
                start_uri: self.start_uri.clone(),
                end_uri_regex: self.end_uri_regex().to_string(),
            },
        }
    }
}

/// `^<转义后的重定向地址>\?.*token_type=Bearer.*`
fn completion_pattern(redirect_url: &str) -> String {
    format!(r"^{}\?.*token_type=Bearer.*", regex::escape(redirect_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_flow() -> LoginFlow {
        LoginFlow::from_endpoints(&OAuthEndpoints {
            redirect_url: "https://example.com/cb".to_string(),
            client_id: "1234".to_string(),
            ..OAuthEndpoints::default()
        })
        .unwrap()
    }

    #[test]
    fn completion_regex_requires_bearer_redirect() {
        let flow = example_flow();
        assert!(flow.is_completion("https://example.com/cb?x=1&token_type=Bearer&y=2"));
        assert!(!flow.is_completion("https://example.com/cb?x=1"));
        assert!(!flow.is_completion("https://example.com/cbx?token_type=Bearer"));
        assert!(!flow.is_completion(
            "https://evil.test/?r=https://example.com/cb?token_type=Bearer"
        ));
    }

    #[test]
    fn redirect_url_is_escaped() {
        assert_eq!(
            example_flow().end_uri_regex(),
            r"^https://example\.com/cb\?.*token_type=Bearer.*"
        );
    }

    #[test]
    fn start_uri_carries_client_and_redirect() {
        let flow = example_flow();
        let url = Url::parse(flow.start_uri()).unwrap();
        assert_eq!(url.path(), "/oauth/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "1234".into())));
        assert!(pairs.contains(&("redirect_uri".into(), "https://example.com/cb".into())));
        assert!(pairs.contains(&("response_type".into(), "token".into())));
    }

    #[test]
    fn next_step_is_web_session() {
        let step = example_flow().next_step();
        assert_eq!(step.next_step, "web_session");
        assert_eq!(step.auth_params.window_title, "Login to osu!");
        assert_eq!(step.auth_params.window_width, 570);
        assert_eq!(step.auth_params.window_height, 700);
    }

    #[test]
    fn invalid_authorize_url_is_rejected() {
        let endpoints = OAuthEndpoints {
            authorize_url: "not a url".to_string(),
            ..OAuthEndpoints::default()
        };
        assert!(LoginFlow::from_endpoints(&endpoints).is_err());
    }
}
