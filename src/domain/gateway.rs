//! REST 网关抽象
//!
//! 同步核心消费的远端接口集合。具体实现位于 infrastructure 层
//! （`ApiClient`），测试中以内存桩替换。

use async_trait::async_trait;

use crate::domain::model::{LoginResponse, Notification, OrderRecord, UserProfile};
use crate::error::Result;

/// REST 网关接口
///
/// 所有请求在有 token 时携带 Bearer 头；任何认证失败响应触发全局登出
/// 策略（见 `ApiClient`），而不是由单个调用方处理。
#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse>;

    async fn logout(&self) -> Result<()>;

    async fn fetch_current_user(&self) -> Result<UserProfile>;

    async fn fetch_orders(&self) -> Result<Vec<OrderRecord>>;

    async fn fetch_notifications(&self) -> Result<Vec<Notification>>;

    async fn mark_notification_read(&self, id: &str) -> Result<()>;

    async fn mark_all_notifications_read(&self) -> Result<()>;
}
