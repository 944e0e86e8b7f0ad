//! REST 网关客户端
//!
//! 出站请求在有 token 时统一携带 Bearer 头；响应侧只有一个跨切面拦截：
//! 任何认证失败状态（401）清空本地 token 并发出 `ForcedLogout` 事件，
//! 由会话管理侧完成强制登出，单个调用方不做认证失败处理。

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use url::Url;

use crate::domain::gateway::ApiGateway;
use crate::domain::model::{LoginResponse, Notification, OrderRecord, UserProfile};
use crate::error::{Result, SyncError};

/// 认证事件（API 客户端 → 会话管理）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// 服务端拒绝认证，需要强制登出
    ForcedLogout,
}

/// Bearer token 存储
///
/// 由会话管理写入、API 客户端与实时通道读取。
#[derive(Default)]
pub struct TokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}

/// REST 网关客户端
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<TokenStore>,
    auth_events: mpsc::UnboundedSender<AuthEvent>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        tokens: Arc<TokenStore>,
        auth_events: mpsc::UnboundedSender<AuthEvent>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SyncError::Config(format!("invalid api_base_url: {}", e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            tokens,
            auth_events,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        // base_url 以路径段拼接，保持末尾无斜杠的写法也能工作
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| SyncError::Config(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.get().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 统一响应检查：401 触发全局强制登出，其余非成功状态映射为 API 错误
    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("API request rejected with 401, forcing logout");
            self.tokens.clear().await;
            if self.auth_events.send(AuthEvent::ForcedLogout).is_err() {
                debug!("Auth event receiver dropped");
            }
            return Err(SyncError::AuthRejected);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authorize(self.http.get(self.endpoint(path)?)).await;
        let response = self.check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        let request = self.authorize(self.http.post(self.endpoint(path)?)).await;
        self.check(request.send().await?).await?;
        Ok(())
    }

    async fn patch_empty(&self, path: &str) -> Result<()> {
        let request = self.authorize(self.http.patch(self.endpoint(path)?)).await;
        self.check(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl ApiGateway for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = self
            .http
            .post(self.endpoint("auth/login")?)
            .json(&LoginRequest { email, password });
        let response = self.check(request.send().await?).await?;
        Ok(response.json::<LoginResponse>().await?)
    }

    async fn logout(&self) -> Result<()> {
        self.post_empty("auth/logout").await
    }

    async fn fetch_current_user(&self) -> Result<UserProfile> {
        self.get_json("auth/me").await
    }

    async fn fetch_orders(&self) -> Result<Vec<OrderRecord>> {
        self.get_json("orders").await
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        self.get_json("notifications").await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<()> {
        self.patch_empty(&format!("notifications/{}/read", id)).await
    }

    async fn mark_all_notifications_read(&self) -> Result<()> {
        self.patch_empty("notifications/read-all").await
    }
}
