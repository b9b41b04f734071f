//! 插件清单（manifest.json）模型与加载。
//!
//! 清单随插件一起打包，启动时只读取一次：
//! - `version` 作为插件版本上报给宿主
//! - `platform` 作为平台标识出现在能力声明中
//! - `oauth` 段（可选）覆盖默认的 OAuth 端点
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::oauth::OAuthEndpoints;

/// 清单根对象。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// 插件显示名称。
    pub name: String,
    /// 宿主侧的平台标识。
    pub platform: String,
    /// 插件唯一 ID。
    pub guid: Uuid,
    /// 插件版本（原样上报给宿主）。
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub url: String,
    /// OAuth 端点配置。
    #[serde(default)]
    pub oauth: OAuthEndpoints,
}

impl PluginManifest {
    /// 从 JSON 文本解析清单并校验必填字段。
    ///
    /// 异常处理：
    /// - JSON 解析失败返回错误
    /// - `version`/`platform` 为空白时返回错误
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let manifest: PluginManifest = serde_json::from_slice(raw).context("解析 manifest.json 失败")?;
        if manifest.version.trim().is_empty() {
            return Err(anyhow!("manifest.json 缺少 version"));
        }
        if manifest.platform.trim().is_empty() {
            return Err(anyhow!("manifest.json 缺少 platform"));
        }
        Ok(manifest)
    }
}

/// 读取并解析清单文件。
///
/// 异常处理：
/// - 文件不存在/无权限等 IO 错误返回错误（附带路径）
pub fn load(path: &Path) -> Result<PluginManifest> {
    let bytes = std::fs::read(path).with_context(|| format!("读取清单失败: {}", path.display()))?;
    PluginManifest::from_json(&bytes).with_context(|| format!("清单无效: {}", path.display()))
}
