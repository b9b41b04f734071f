//! osu! 启动器集成插件核心库（跨平台/不涉及系统调用）。
//!
//! 功能：
//! - 定义 OAuth 重定向凭据解析与身份（用户 ID/用户名）推导
//! - 定义游戏目录条目、本地游戏状态位集等数据模型
//! - 定义宿主（启动器）与插件之间的单行 JSON 消息协议
//! - 定义插件清单（manifest.json）与 OAuth 端点配置
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

pub mod auth;
pub mod manifest;
pub mod model;
pub mod oauth;
pub mod rpc;
