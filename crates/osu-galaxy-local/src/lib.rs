//! 本机状态探测与游戏启动（文件系统、注册表、进程、浏览器）。
//!
//! 目标：
//! - 将平台相关的查询集中封装，插件层只依赖 [`LocalClient`]
//! - 探测类接口（是否安装/是否运行）不返回错误：查不到即视为 `false`
//! - 每次查询都重新读取系统状态，不做缓存
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

pub mod browser;
pub mod client;
pub mod launch;
pub mod paths;
pub mod process;
#[cfg(windows)]
pub mod registry;

pub use client::LocalClient;
pub use launch::{LaunchError, LaunchHandle};
