//! auth 切片：当前会话

use crate::domain::model::Session;

/// auth 切片状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
}

impl AuthState {
    pub fn authenticated(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.authenticated)
            .unwrap_or(false)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }
}

/// auth 切片动作
#[derive(Debug, Clone)]
pub enum AuthAction {
    /// 登录成功，建立会话
    LoggedIn(Session),
    /// 登出或认证失败，销毁会话
    LoggedOut,
}

/// auth reducer
pub fn reduce(state: &mut AuthState, action: AuthAction) {
    match action {
        AuthAction::LoggedIn(session) => {
            state.session = Some(session);
        }
        AuthAction::LoggedOut => {
            state.session = None;
        }
    }
}
