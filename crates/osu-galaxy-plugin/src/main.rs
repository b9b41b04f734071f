//! osu! 启动器集成插件（由宿主启动的独立进程）。
//!
//! 职责：
//! - 读取随插件打包的 `manifest.json`（版本、平台标识、OAuth 端点）
//! - 连接宿主分配的本机端口，按行收发协议消息
//! - 将宿主调用交给插件门面：网页登录、游戏目录、本地状态、安装与启动
//!
//! 启动方式：
//! - `osu-galaxy-plugin <token> <port> [--manifest <path>] [--install-dir <dir>]`
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

mod error;
mod facade;
mod server;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use osu_galaxy_core::manifest;
use osu_galaxy_core::oauth::LoginFlow;
use osu_galaxy_local::LocalClient;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::facade::PluginFacade;
use crate::server::{ChannelNotifier, ServerContext};

/// 命令行参数。
///
/// 说明：
/// - `token`/`port` 由宿主按位置参数传入
/// - `install_dir` 用于覆盖自动探测的游戏安装目录（便于便携版/测试）
#[derive(Debug, Parser)]
#[command(name = "osu-galaxy-plugin", version)]
struct Cli {
    /// 宿主分配的插件令牌（不写日志）。
    token: String,

    /// 宿主在 127.0.0.1 上监听的端口。
    port: u16,

    /// 清单文件路径（默认与可执行文件同目录的 manifest.json）。
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// 游戏安装目录。
    #[arg(long, env = "OSU_INSTALL_DIR")]
    install_dir: Option<PathBuf>,
}

/// 程序入口：初始化日志、加载清单、连接宿主并进入消息循环。
///
/// 异常处理：
/// - 清单读取/解析失败、OAuth 配置无效、连接宿主失败会返回错误并退出
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let manifest_path = match cli.manifest {
        Some(path) => path,
        None => current_exe_dir()?.join("manifest.json"),
    };
    let manifest = manifest::load(&manifest_path)?;
    info!("启动插件: {} {}", manifest.name, manifest.version);

    let login = LoginFlow::from_endpoints(&manifest.oauth)?;
    if manifest.oauth.client_id.is_empty() {
        warn!("manifest.json 未配置 oauth.client_id，网页登录将无法通过授权");
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let facade = Arc::new(PluginFacade::new(
        manifest.version.clone(),
        login,
        LocalClient::new(cli.install_dir),
        ChannelNotifier::new(tx.clone()),
    ));

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("连接宿主失败: {addr}"))?;
    info!("已连接宿主: {addr}");

    let ctx = ServerContext {
        platform: manifest.platform,
        token: cli.token,
    };
    server::serve(stream, facade, ctx, tx, rx).await?;
    info!("插件已退出");
    Ok(())
}

/// 获取当前可执行文件所在目录。
///
/// 异常处理：
/// - 无法获取当前 exe 路径时返回错误
fn current_exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("读取当前可执行文件路径失败")?;
    Ok(exe.parent().unwrap_or_else(|| Path::new(".")).to_path_buf())
}
