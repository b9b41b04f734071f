//! 宿主连接：按行收发 JSON 消息，并把调用分发给插件门面。
//!
//! 结构：
//! - 读循环：逐行解析请求，同步调用在循环内直接处理
//! - `launch_game` 会一直等到游戏退出，因此放到独立任务中执行，读循环继续服务宿主
//! - 写任务：所有响应与通知经同一个通道串行写出，保证单行消息不交错
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::sync::Arc;

use anyhow::{Context, Result};
use osu_galaxy_core::auth::Credentials;
use osu_galaxy_core::model::LocalGame;
use osu_galaxy_core::rpc::{
    codes, Capabilities, HostCall, RpcError, RpcNotification, RpcRequest, RpcResponse,
};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::error::PluginError;
use crate::facade::{AuthPhase, HostNotifier, PluginFacade};

/// 向宿主声明的能力。
const FEATURES: [&str; 4] = [
    "ImportOwnedGames",
    "ImportInstalledGames",
    "LaunchGame",
    "InstallGame",
];

/// 写任务的输入。
#[derive(Debug)]
pub enum Outgoing {
    /// 一条已序列化的消息（不含换行）。
    Frame(String),
    /// 写完之前的消息后结束写任务。
    Close,
}

/// 通过写通道把回调转发给宿主。
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: UnboundedSender<Outgoing>,
}

impl ChannelNotifier {
    pub fn new(tx: UnboundedSender<Outgoing>) -> Self {
        Self { tx }
    }

    fn notify(&self, notification: RpcNotification) {
        send_frame(&self.tx, &notification, notification.method);
    }
}

impl HostNotifier for ChannelNotifier {
    fn store_credentials(&self, credentials: &Credentials) {
        self.notify(RpcNotification::store_credentials(credentials));
    }

    fn push_local_status(&self, local_game: LocalGame) {
        info!("上报本地状态: {} = {}", local_game.game_id, local_game.local_game_state);
        self.notify(RpcNotification::local_game_status_changed(&local_game));
    }
}

/// 连接级上下文（启动参数与清单信息）。
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub platform: String,
    pub token: String,
}

/// 服务宿主连接，直到宿主断开或请求关闭。
///
/// 参数：
/// - `stream`：已连接到宿主的 TCP 流
/// - `facade`：插件门面（其回调与本函数共用 `tx`）
/// - `tx`/`rx`：写通道两端
///
/// 异常处理：
/// - 读取失败（连接被重置等）返回错误
/// - 单条消息的解析/处理失败以错误响应回给宿主，不中断连接
pub async fn serve(
    stream: TcpStream,
    facade: Arc<PluginFacade<ChannelNotifier>>,
    ctx: ServerContext,
    tx: UnboundedSender<Outgoing>,
    rx: UnboundedReceiver<Outgoing>,
) -> Result<()> {
    let (reader, writer) = stream.into_split();
    let writer_task = tokio::spawn(write_loop(writer, rx));

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await.context("读取宿主消息失败")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let req: RpcRequest = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                let err = RpcError::new(codes::PARSE_ERROR, format!("bad request: {e}"));
                send_frame(&tx, &RpcResponse::failure(Value::Null, err), "error");
                continue;
            }
        };
        debug!(method = %req.method, "收到宿主请求");
        let id = req.id;
        let call = match HostCall::parse(&req.method, req.params) {
            Ok(call) => call,
            Err(err) => {
                reply(&tx, id, Err(err));
                continue;
            }
        };
        match call {
            HostCall::Shutdown => {
                info!("宿主请求关闭插件");
                reply(&tx, id, Ok(Value::Null));
                break;
            }
            HostCall::LaunchGame(params) => {
                let facade = Arc::clone(&facade);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = facade.launch_game(&params.game_id).await;
                    reply(&tx, id, to_wire(result.map(|()| Value::Null)));
                });
            }
            other => reply(&tx, id, to_wire(dispatch(&*facade, &ctx, other))),
        }
    }

    let _ = tx.send(Outgoing::Close);
    writer_task.await.context("写任务异常退出")??;
    Ok(())
}

/// 处理同步调用。
fn dispatch<H: HostNotifier>(
    facade: &PluginFacade<H>,
    ctx: &ServerContext,
    call: HostCall,
) -> Result<Value, PluginError> {
    let value = match call {
        HostCall::GetCapabilities => serde_json::to_value(Capabilities {
            platform_name: ctx.platform.clone(),
            plugin_version: facade.version().to_string(),
            features: FEATURES.to_vec(),
            token: ctx.token.clone(),
        })?,
        HostCall::InitAuthentication(p) => {
            serde_json::to_value(facade.authenticate(p.stored_credentials)?)?
        }
        HostCall::PassLoginCredentials(p) => {
            if facade.phase() != AuthPhase::AwaitingWebLogin {
                debug!("未处于等待网页登录状态，仍按登录结果处理");
            }
            serde_json::to_value(facade.complete_web_login(&p.credentials.end_uri, &p.cookies)?)?
        }
        HostCall::ImportOwnedGames => serde_json::to_value(facade.list_owned_games())?,
        HostCall::ImportLocalGames => serde_json::to_value(facade.list_local_games())?,
        HostCall::InstallGame(p) => {
            facade.install_game(&p.game_id)?;
            Value::Null
        }
        // 启动与关闭由读循环处理。
        HostCall::Ping | HostCall::LaunchGame(_) | HostCall::Shutdown => Value::Null,
    };
    Ok(value)
}

fn to_wire(result: Result<Value, PluginError>) -> Result<Value, RpcError> {
    result.map_err(|e| {
        warn!("请求处理失败: {e}");
        e.to_rpc()
    })
}

/// 回复请求；宿主通知（无 `id`）不回复。
fn reply(tx: &UnboundedSender<Outgoing>, id: Option<Value>, result: Result<Value, RpcError>) {
    let Some(id) = id else {
        if let Err(err) = result {
            debug!("通知处理失败（不回复）: {}", err.message);
        }
        return;
    };
    let response = match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::failure(id, err),
    };
    send_frame(tx, &response, "response");
}

fn send_frame<T: Serialize>(tx: &UnboundedSender<Outgoing>, message: &T, what: &str) {
    match serde_json::to_string(message) {
        Ok(line) => {
            if tx.send(Outgoing::Frame(line)).is_err() {
                warn!("宿主连接已关闭，丢弃消息: {what}");
            }
        }
        Err(e) => warn!("序列化消息失败: {what}: {e}"),
    }
}

/// 写任务：逐条写出并追加换行。
async fn write_loop(mut writer: OwnedWriteHalf, mut rx: UnboundedReceiver<Outgoing>) -> Result<()> {
    while let Some(msg) = rx.recv().await {
        match msg {
            Outgoing::Frame(mut line) => {
                line.push('\n');
                writer
                    .write_all(line.as_bytes())
                    .await
                    .context("写入宿主连接失败")?;
            }
            Outgoing::Close => break,
        }
    }
    writer.flush().await.context("刷新宿主连接失败")?;
    Ok(())
}
