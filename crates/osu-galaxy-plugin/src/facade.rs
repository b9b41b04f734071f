//! 插件门面：实现宿主插件契约，组合身份客户端与本地客户端。
//!
//! 认证状态机：
//! - `Unauthenticated` → `AwaitingWebLogin`（无已存凭据，返回网页登录指令）
//! - `AwaitingWebLogin` → `Authenticated`（宿主回传登录完成地址）
//! - `Unauthenticated` → `Authenticated`（已存凭据加载成功）
//! - `Authenticated` 为终态（不提供登出）
//!
//! 其他操作（游戏目录、本地状态、安装、启动）与认证状态无关。
//!
//! 并发约定：
//! - 宿主逐个调用；只有 `launch_game` 会在等待子进程退出时挂起
//! - 认证状态的锁不会跨越 `.await` 持有
//!
//! 作者：osu! 集成插件项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::sync::{Mutex, MutexGuard, PoisonError};

use osu_galaxy_core::auth::{Credentials, IdentityClient};
use osu_galaxy_core::model::{
    AuthOutcome, Authentication, Game, LocalGame, LocalGameState, OSU_DOWNLOAD_URL, OSU_GAME_ID,
};
use osu_galaxy_core::oauth::LoginFlow;
use osu_galaxy_core::rpc::Cookie;
use osu_galaxy_local::{browser, LocalClient};
use tracing::{debug, info, warn};

use crate::error::PluginError;

/// 插件 → 宿主的回调。
pub trait HostNotifier: Send + Sync {
    /// 请求宿主持久化凭据。
    fn store_credentials(&self, credentials: &Credentials);
    /// 上报本地游戏状态变化。
    fn push_local_status(&self, local_game: LocalGame);
}

/// 打开网页的方式（默认使用系统浏览器）。
pub type UrlOpener = Box<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Unauthenticated,
    AwaitingWebLogin,
    Authenticated,
}

struct AuthState {
    client: IdentityClient,
    phase: AuthPhase,
}

pub struct PluginFacade<H> {
    version: String,
    login: LoginFlow,
    auth: Mutex<AuthState>,
    local: LocalClient,
    host: H,
    open_url: UrlOpener,
}

impl<H: HostNotifier> PluginFacade<H> {
    /// 创建门面。
    ///
    /// 参数：
    /// - `version`：清单中的插件版本（启动时读取一次）
    /// - `login`：已校验的网页登录流程
    /// - `local`：本地状态探测器
    /// - `host`：宿主回调
    pub fn new(version: String, login: LoginFlow, local: LocalClient, host: H) -> Self {
        Self {
            version,
            login,
            auth: Mutex::new(AuthState {
                client: IdentityClient::new(),
                phase: AuthPhase::Unauthenticated,
            }),
            local,
            host,
            open_url: Box::new(browser::open_url),
        }
    }

    /// 替换打开网页的方式。
    #[cfg(test)]
    pub fn with_url_opener(mut self, open_url: UrlOpener) -> Self {
        self.open_url = open_url;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn phase(&self) -> AuthPhase {
        self.lock_auth().phase
    }

    /// 开始认证。
    ///
    /// 返回值：
    /// - 提供了已存凭据：加载成功后返回用户身份
    /// - 未提供：返回网页登录指令，进入等待网页登录状态
    ///
    /// 异常处理：
    /// - 已存凭据缺少必需字段：`InvalidCredentials`，宿主应不带凭据重新认证
    pub fn authenticate(&self, stored: Option<Credentials>) -> Result<AuthOutcome, PluginError> {
        let mut auth = self.lock_auth();
        let Some(stored) = stored else {
            auth.phase = AuthPhase::AwaitingWebLogin;
            info!("无已存凭据，请求宿主打开网页登录");
            return Ok(AuthOutcome::NextStep(self.login.next_step()));
        };
        let identity = auth
            .client
            .load_credentials(stored)
            .map(Authentication::from)
            .inspect_err(|e| warn!("加载已存凭据失败: {e}"))?;
        auth.phase = AuthPhase::Authenticated;
        info!(user_id = %identity.user_id, "已使用已存凭据完成认证");
        Ok(AuthOutcome::Authenticated(identity))
    }

    /// 完成网页登录。
    ///
    /// 参数：
    /// - `end_uri`：浏览器导航到的登录完成地址
    /// - `cookies`：浏览器会话 Cookie（不使用）
    ///
    /// 行为：
    /// - 取 `?` 之后的查询串解析凭据，成功后通知宿主持久化
    ///
    /// 异常处理：
    /// - 地址中没有可用的 Bearer 令牌：`MalformedRedirect`，不会通知宿主持久化
    pub fn complete_web_login(
        &self,
        end_uri: &str,
        cookies: &[Cookie],
    ) -> Result<Authentication, PluginError> {
        if !self.login.is_completion(end_uri) {
            warn!("登录完成地址与匹配规则不一致，仍尝试解析");
        }
        debug!(cookies = cookies.len(), "收到网页登录结果");
        let query = end_uri.split_once('?').map_or(end_uri, |(_, q)| q);

        let mut auth = self.lock_auth();
        let identity = auth
            .client
            .set_credentials_from_redirect(query)
            .map(Authentication::from)?;
        let credentials = auth.client.credentials()?.clone();
        auth.phase = AuthPhase::Authenticated;
        drop(auth);

        self.host.store_credentials(&credentials);
        info!(user_id = %identity.user_id, "网页登录完成");
        Ok(identity)
    }

    /// 已拥有游戏：固定为 osu!（免费游戏，不做授权校验）。
    pub fn list_owned_games(&self) -> Vec<Game> {
        vec![Game::osu()]
    }

    /// 本地游戏状态：安装与运行两个标志独立探测。
    pub fn list_local_games(&self) -> Vec<LocalGame> {
        let mut state = LocalGameState::NONE;
        if self.local.is_installed() {
            state |= LocalGameState::INSTALLED;
        }
        if self.local.is_running() {
            state |= LocalGameState::RUNNING;
        }
        debug!(%state, "本地状态");
        vec![LocalGame::osu(state)]
    }

    /// 打开官方下载页（不跟踪安装结果）。
    pub fn install_game(&self, game_id: &str) -> Result<(), PluginError> {
        ensure_known_game(game_id)?;
        if let Err(e) = (self.open_url)(OSU_DOWNLOAD_URL) {
            warn!("打开下载页失败: {e}");
        }
        Ok(())
    }

    /// 启动游戏并在进程退出前后各上报一次状态。
    ///
    /// 异常处理：
    /// - 启动失败时直接返回错误，不上报任何状态
    pub async fn launch_game(&self, game_id: &str) -> Result<(), PluginError> {
        ensure_known_game(game_id)?;
        let handle = self.local.launch()?;
        self.host
            .push_local_status(LocalGame::osu(LocalGameState::INSTALLED | LocalGameState::RUNNING));
        handle.wait().await;
        self.host.push_local_status(LocalGame::osu(LocalGameState::INSTALLED));
        Ok(())
    }

    fn lock_auth(&self) -> MutexGuard<'_, AuthState> {
        self.auth.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ensure_known_game(game_id: &str) -> Result<(), PluginError> {
    if game_id == OSU_GAME_ID {
        Ok(())
    } else {
        Err(PluginError::UnknownGame(game_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use osu_galaxy_core::auth::CredentialsError;
    use osu_galaxy_core::oauth::OAuthEndpoints;
    use osu_galaxy_local::paths::GAME_EXE;
    use osu_galaxy_local::LaunchError;
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum HostEvent {
        Stored(Credentials),
        Status(LocalGameState),
    }

    #[derive(Clone, Default)]
    struct RecordingHost(Arc<Mutex<Vec<HostEvent>>>);

    impl RecordingHost {
        fn events(&self) -> Vec<HostEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    impl HostNotifier for RecordingHost {
        fn store_credentials(&self, credentials: &Credentials) {
            self.0.lock().unwrap().push(HostEvent::Stored(credentials.clone()));
        }

        fn push_local_status(&self, local_game: LocalGame) {
            assert_eq!(local_game.game_id, OSU_GAME_ID);
            self.0.lock().unwrap().push(HostEvent::Status(local_game.local_game_state));
        }
    }

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(prefix: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::new_v4()));
            std::fs::create_dir_all(&dir).expect("create temp dir");
            Self(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    // 运行检测按进程名匹配，会看到同一测试进程里其他用例启动的游戏进程。
    static GAME_PROCESS_LOCK: Mutex<()> = Mutex::new(());

    fn lock_game_processes() -> MutexGuard<'static, ()> {
        GAME_PROCESS_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 在 `dir` 中放一个与游戏同名的脚本并启动，模拟从别处启动的游戏。
    #[cfg(unix)]
    struct RunningGame(std::process::Child);

    #[cfg(unix)]
    impl RunningGame {
        fn start(dir: &TempDir) -> Self {
            use std::os::unix::fs::PermissionsExt;

            let exe = dir.0.join(GAME_EXE);
            std::fs::write(&exe, "#!/bin/sh\nsleep 5\n").unwrap();
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
            let child = std::process::Command::new(&exe)
                .spawn()
                .expect("start game stand-in");
            Self(child)
        }
    }

    #[cfg(unix)]
    impl Drop for RunningGame {
        fn drop(&mut self) {
            let _ = self.0.kill();
            let _ = self.0.wait();
        }
    }

    fn make_facade(install_dir: &TempDir) -> (PluginFacade<RecordingHost>, RecordingHost) {
        let login = LoginFlow::from_endpoints(&OAuthEndpoints {
            redirect_url: "https://example.com/cb".to_string(),
            client_id: "42".to_string(),
            ..OAuthEndpoints::default()
        })
        .unwrap();
        let host = RecordingHost::default();
        let facade = PluginFacade::new(
            "0.1.0".to_string(),
            login,
            LocalClient::new(Some(install_dir.0.clone())),
            host.clone(),
        );
        (facade, host)
    }

    #[test]
    fn authenticate_without_credentials_requests_web_login() {
        let dir = TempDir::new("osu-galaxy-facade-auth");
        let (facade, host) = make_facade(&dir);

        let outcome = facade.authenticate(None).unwrap();
        let AuthOutcome::NextStep(step) = outcome else {
            panic!("expected next step");
        };
        assert_eq!(facade.phase(), AuthPhase::AwaitingWebLogin);
        assert!(step.auth_params.start_uri.starts_with("https://osu.ppy.sh/oauth/authorize?"));

        let re = regex::Regex::new(&step.auth_params.end_uri_regex).unwrap();
        assert!(re.is_match("https://example.com/cb?x=1&token_type=Bearer&y=2"));
        assert!(!re.is_match("https://example.com/cb?x=1"));
        assert!(host.events().is_empty());
    }

    #[test]
    fn web_login_stores_credentials_and_authenticates() {
        let dir = TempDir::new("osu-galaxy-facade-login");
        let (facade, host) = make_facade(&dir);
        facade.authenticate(None).unwrap();

        let auth = facade
            .complete_web_login(
                "https://example.com/cb?access_token=abc&token_type=Bearer&user_id=2&username=peppy",
                &[],
            )
            .unwrap();
        assert_eq!(auth.user_id, "2");
        assert_eq!(auth.user_name, "peppy");
        assert_eq!(facade.phase(), AuthPhase::Authenticated);

        let events = host.events();
        assert_eq!(events.len(), 1);
        let HostEvent::Stored(stored) = &events[0] else {
            panic!("expected stored credentials");
        };
        assert_eq!(stored.first("access_token"), Some("abc"));

        // 下一次启动：用宿主保存的凭据直接认证，得到相同身份。
        let (next_run, _) = make_facade(&dir);
        match next_run.authenticate(Some(stored.clone())).unwrap() {
            AuthOutcome::Authenticated(again) => assert_eq!(again, auth),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(next_run.phase(), AuthPhase::Authenticated);
    }

    #[test]
    fn malformed_redirect_stores_nothing() {
        let dir = TempDir::new("osu-galaxy-facade-bad-login");
        let (facade, host) = make_facade(&dir);
        facade.authenticate(None).unwrap();

        let err = facade
            .complete_web_login("https://example.com/cb?error=access_denied", &[])
            .unwrap_err();
        assert!(matches!(
            err,
            PluginError::Credentials(CredentialsError::MalformedRedirect(_))
        ));
        assert_eq!(facade.phase(), AuthPhase::AwaitingWebLogin);
        assert!(host.events().is_empty());
    }

    #[test]
    fn invalid_stored_credentials_are_rejected() {
        let dir = TempDir::new("osu-galaxy-facade-invalid");
        let (facade, _) = make_facade(&dir);
        let stored: Credentials = serde_json::from_str(r#"{"token_type":"Bearer"}"#).unwrap();
        let err = facade.authenticate(Some(stored)).unwrap_err();
        assert!(matches!(
            err,
            PluginError::Credentials(CredentialsError::InvalidCredentials(_))
        ));
        assert_eq!(facade.phase(), AuthPhase::Unauthenticated);
    }

    #[test]
    fn owned_games_ignore_auth_state() {
        let dir = TempDir::new("osu-galaxy-facade-owned");
        let (facade, _) = make_facade(&dir);
        let before = facade.list_owned_games();
        facade.authenticate(None).unwrap();
        let after = facade.list_owned_games();
        assert_eq!(before, after);
        assert_eq!(before, vec![Game::osu()]);
    }

    #[test]
    fn local_games_follow_install_artifact() {
        let _guard = lock_game_processes();
        let dir = TempDir::new("osu-galaxy-facade-local");
        let (facade, _) = make_facade(&dir);
        assert_eq!(facade.list_local_games(), vec![LocalGame::osu(LocalGameState::NONE)]);

        std::fs::write(dir.0.join(GAME_EXE), "").unwrap();
        assert_eq!(facade.list_local_games(), vec![LocalGame::osu(LocalGameState::INSTALLED)]);
    }

    #[cfg(unix)]
    #[test]
    fn running_without_install_is_reported_as_is() {
        let _guard = lock_game_processes();
        let elsewhere = TempDir::new("osu-galaxy-facade-running-elsewhere");
        let game = RunningGame::start(&elsewhere);
        let dir = TempDir::new("osu-galaxy-facade-running-empty");
        let (facade, host) = make_facade(&dir);

        assert_eq!(facade.list_local_games(), vec![LocalGame::osu(LocalGameState::RUNNING)]);
        assert!(host.events().is_empty());

        drop(game);
        assert_eq!(facade.list_local_games(), vec![LocalGame::osu(LocalGameState::NONE)]);
    }

    #[test]
    fn install_opens_download_page() {
        let dir = TempDir::new("osu-galaxy-facade-install");
        let opened = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&opened);
        let (facade, _) = make_facade(&dir);
        let facade = facade.with_url_opener(Box::new(move |url: &str| {
            sink.lock().unwrap().push(url.to_string());
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser"))
        }));

        facade.install_game(OSU_GAME_ID).unwrap();
        assert_eq!(opened.lock().unwrap().as_slice(), [OSU_DOWNLOAD_URL]);

        let err = facade.install_game("osu!lazer").unwrap_err();
        assert!(matches!(err, PluginError::UnknownGame(_)));
        assert_eq!(opened.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn launch_failure_pushes_no_status() {
        let dir = TempDir::new("osu-galaxy-facade-launch-missing");
        let (facade, host) = make_facade(&dir);

        let err = facade.launch_game(OSU_GAME_ID).await.unwrap_err();
        assert!(matches!(err, PluginError::Launch(LaunchError::NotFound(_))));
        assert!(host.events().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn launch_reports_running_then_installed() {
        use std::os::unix::fs::PermissionsExt;

        let _guard = lock_game_processes();
        let dir = TempDir::new("osu-galaxy-facade-launch");
        let exe = dir.0.join(GAME_EXE);
        std::fs::write(&exe, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        let (facade, host) = make_facade(&dir);

        facade.launch_game(OSU_GAME_ID).await.unwrap();
        assert_eq!(
            host.events(),
            vec![
                HostEvent::Status(LocalGameState::INSTALLED | LocalGameState::RUNNING),
                HostEvent::Status(LocalGameState::INSTALLED),
            ]
        );
    }
}
