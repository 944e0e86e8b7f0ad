//! 会话生命周期管理
//!
//! 持有唯一会话，向下游（同步桥接）通过 watch 发布认证状态。
//! 会话销毁的入口有三个：用户登出、恢复会话失败、服务端认证失败
//! 触发的强制登出；三者都收敛到同一条清理路径。

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::gateway::ApiGateway;
use crate::domain::model::{Session, UserRole};
use crate::error::Result;
use crate::infrastructure::api::TokenStore;
use crate::store::{AuthAction, StateStore};

/// 对外发布的会话状态快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user_id: Option<String>,
    pub role: Option<UserRole>,
    pub token: Option<String>,
    pub authenticated: bool,
}

impl SessionState {
    fn from_session(session: &Session) -> Self {
        Self {
            user_id: Some(session.user_id.clone()),
            role: Some(session.role),
            token: Some(session.auth_token.clone()),
            authenticated: session.authenticated,
        }
    }
}

/// 会话管理器
pub struct SessionManager {
    api: Arc<dyn ApiGateway>,
    tokens: Arc<TokenStore>,
    store: Arc<StateStore>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn ApiGateway>,
        tokens: Arc<TokenStore>,
        store: Arc<StateStore>,
    ) -> Arc<Self> {
        let (state_tx, _state_rx) = watch::channel(SessionState::default());
        Arc::new(Self {
            api,
            tokens,
            store,
            state_tx,
        })
    }

    /// 订阅会话状态变化（同步桥接的驱动源）
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// 登录
    ///
    /// 成功后写入 token、建立会话并发布认证状态；失败原样返回给调用方
    /// （登录表单的错误展示属于外部协作方）。
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let response = self.api.login(email, password).await?;

        self.tokens.set(response.token.clone()).await;
        let session = Session {
            user_id: response.user.id,
            role: response.user.role,
            auth_token: response.token,
            authenticated: true,
        };
        self.store
            .dispatch_auth(AuthAction::LoggedIn(session.clone()))
            .await;
        info!(user_id = %session.user_id, "Session established");
        self.state_tx.send_replace(SessionState::from_session(&session));
        Ok(())
    }

    /// 用已存储的 token 恢复会话（页面刷新场景）
    ///
    /// fetch-current-user 失败视为会话失效：静默清理本地会话，
    /// 不向用户弹出错误。
    pub async fn restore(&self) -> Result<()> {
        let Some(token) = self.tokens.get().await else {
            debug!("No stored token, nothing to restore");
            return Ok(());
        };

        match self.api.fetch_current_user().await {
            Ok(user) => {
                let session = Session {
                    user_id: user.id,
                    role: user.role,
                    auth_token: token,
                    authenticated: true,
                };
                self.store
                    .dispatch_auth(AuthAction::LoggedIn(session.clone()))
                    .await;
                info!(user_id = %session.user_id, "Session restored");
                self.state_tx.send_replace(SessionState::from_session(&session));
                Ok(())
            }
            Err(err) => {
                // 认证被拒是预期内的会话过期，不按故障告警
                if err.is_auth_rejected() {
                    debug!("Stored token rejected, clearing session");
                } else {
                    warn!(error = %err, "Session restore failed, clearing session");
                }
                self.clear_session().await;
                Err(err)
            }
        }
    }

    /// 用户主动登出
    ///
    /// 服务端登出是尽力而为；本地会话无条件销毁。
    pub async fn logout(&self) {
        if let Err(err) = self.api.logout().await {
            debug!(error = %err, "Logout request failed, clearing local session anyway");
        }
        self.clear_session().await;
    }

    /// 强制登出（任意 REST 调用收到认证失败状态时的全局策略）
    pub async fn force_logout(&self) {
        warn!("Forced logout, clearing session");
        self.clear_session().await;
    }

    async fn clear_session(&self) {
        self.tokens.clear().await;
        self.store.dispatch_auth(AuthAction::LoggedOut).await;
        self.state_tx.send_replace(SessionState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LoginResponse, Notification, OrderRecord, UserProfile};
    use crate::error::SyncError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_test::assert_ok;

    /// 网关桩：登录固定成功，fetch_current_user 可配置失败
    #[derive(Default)]
    struct StubGateway {
        fail_current_user: AtomicBool,
    }

    #[async_trait]
    impl ApiGateway for StubGateway {
        async fn login(&self, _email: &str, _password: &str) -> Result<LoginResponse> {
            Ok(LoginResponse {
                token: "tok-1".to_string(),
                user: UserProfile {
                    id: "u-1".to_string(),
                    role: UserRole::Driver,
                },
            })
        }

        async fn logout(&self) -> Result<()> {
            Ok(())
        }

        async fn fetch_current_user(&self) -> Result<UserProfile> {
            if self.fail_current_user.load(Ordering::SeqCst) {
                return Err(SyncError::AuthRejected);
            }
            Ok(UserProfile {
                id: "u-1".to_string(),
                role: UserRole::Driver,
            })
        }

        async fn fetch_orders(&self) -> Result<Vec<OrderRecord>> {
            Ok(vec![])
        }

        async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
            Ok(vec![])
        }

        async fn mark_notification_read(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        async fn mark_all_notifications_read(&self) -> Result<()> {
            Ok(())
        }
    }

    /// 测试：登录建立会话，登出回到初始状态
    #[tokio::test]
    async fn test_login_then_logout_lifecycle() {
        let tokens = TokenStore::new();
        let store = Arc::new(StateStore::new());
        let session = SessionManager::new(
            Arc::new(StubGateway::default()),
            tokens.clone(),
            store.clone(),
        );

        session.login("driver@courier.dev", "secret").await.unwrap();

        let state = session.current();
        assert!(state.authenticated);
        assert_eq!(state.token.as_deref(), Some("tok-1"));
        assert_eq!(tokens.get().await.as_deref(), Some("tok-1"));
        assert!(store.auth().await.authenticated());

        session.logout().await;

        assert_eq!(session.current(), SessionState::default());
        assert_eq!(tokens.get().await, None);
        assert!(!store.auth().await.authenticated());
    }

    /// 测试：恢复会话失败时静默清理本地会话
    #[tokio::test]
    async fn test_restore_failure_tears_session_down() {
        let gateway = Arc::new(StubGateway::default());
        gateway.fail_current_user.store(true, Ordering::SeqCst);
        let tokens = TokenStore::new();
        tokens.set("stale-token".to_string()).await;
        let store = Arc::new(StateStore::new());
        let session = SessionManager::new(gateway, tokens.clone(), store.clone());

        let err = session.restore().await.unwrap_err();
        assert!(err.is_auth_rejected());

        assert_eq!(tokens.get().await, None);
        assert!(!session.current().authenticated);
        assert!(!store.auth().await.authenticated());
    }

    /// 测试：无存储 token 时恢复是无操作
    #[tokio::test]
    async fn test_restore_without_token_is_noop() {
        let session = SessionManager::new(
            Arc::new(StubGateway::default()),
            TokenStore::new(),
            Arc::new(StateStore::new()),
        );

        tokio_test::assert_ok!(session.restore().await);
        assert_eq!(session.current(), SessionState::default());
    }
}
