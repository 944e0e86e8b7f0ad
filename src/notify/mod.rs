//! 通知聚合器
//!
//! 持有持久通知集合与派生未读计数，把 REST 拉取和实时推送收敛为
//! 一个一致视图。读失败对用户静默（后台刷新不打断用户），写失败
//! 弹出错误提示且本地状态不变（无乐观更新，也就无需回滚）。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::channel::{RealtimeChannel, SystemAlertHandler};
use crate::domain::events::SystemAlertEvent;
use crate::domain::gateway::ApiGateway;
use crate::domain::model::{Notification, NotificationKind};
use crate::error::Result;
use crate::store::{NotificationsAction, StateStore};
use crate::toast::ToastBus;

/// 通知聚合器
pub struct NotificationCenter {
    api: Arc<dyn ApiGateway>,
    store: Arc<StateStore>,
    toasts: Arc<ToastBus>,
    /// 已绑定实时订阅的 token；同一 token 重复绑定为无操作
    bound_token: RwLock<Option<String>>,
}

impl NotificationCenter {
    pub fn new(
        api: Arc<dyn ApiGateway>,
        store: Arc<StateStore>,
        toasts: Arc<ToastBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            store,
            toasts,
            bound_token: RwLock::new(None),
        })
    }

    /// 全量拉取通知列表
    ///
    /// 成功时整体替换并重算未读计数；失败时状态不变，仅记录日志
    /// （后台刷新失败不向用户弹出）。
    pub async fn fetch_notifications(&self) {
        match self.api.fetch_notifications().await {
            Ok(notifications) => {
                self.store
                    .dispatch_notifications(NotificationsAction::Replace(notifications))
                    .await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to fetch notifications, keeping current state");
            }
        }
    }

    /// 单条标记已读
    ///
    /// 服务端确认后才修改本地状态；本地不存在该 id 时 reducer 静默无操作。
    pub async fn mark_as_read(&self, id: &str) {
        match self.api.mark_notification_read(id).await {
            Ok(()) => {
                self.store
                    .dispatch_notifications(NotificationsAction::MarkRead(id.to_string()))
                    .await;
            }
            Err(err) => {
                warn!(error = %err, notification_id = %id, "Failed to mark notification as read");
                self.toasts
                    .error("Notifications", "Failed to mark notification as read");
            }
        }
    }

    /// 全部标记已读
    pub async fn clear_all(&self) {
        match self.api.mark_all_notifications_read().await {
            Ok(()) => {
                self.store
                    .dispatch_notifications(NotificationsAction::MarkAllRead)
                    .await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to mark all notifications as read");
                self.toasts
                    .error("Notifications", "Failed to mark all notifications as read");
            }
        }
    }

    /// 绑定实时订阅（每个 token 值至多注册一次）
    ///
    /// 拥有方上下文重复进入（例如 UI 重挂载）时不会累积重复注册。
    pub async fn bind_realtime(self: &Arc<Self>, channel: &RealtimeChannel, token: &str) {
        let mut bound = self.bound_token.write().await;
        if bound.as_deref() == Some(token) {
            debug!("Notification ingestion already bound for this token");
            return;
        }
        channel
            .on_system_alert(Arc::clone(self) as Arc<dyn SystemAlertHandler>)
            .await;
        *bound = Some(token.to_string());
    }

    /// 解绑（通道断开、注册表清空之后调用）
    pub async fn unbind(&self) {
        *self.bound_token.write().await = None;
    }

    fn synthesize(&self, alert: &SystemAlertEvent, user_id: String) -> Notification {
        let kind = alert
            .kind
            .as_deref()
            .map(|k| {
                serde_json::from_value::<NotificationKind>(serde_json::Value::String(
                    k.to_string(),
                ))
                .unwrap_or(NotificationKind::Other)
            })
            .unwrap_or(NotificationKind::SystemAlert);

        Notification {
            id: Uuid::new_v4().to_string(),
            user_id,
            kind,
            title: alert
                .title
                .clone()
                .unwrap_or_else(|| "System alert".to_string()),
            message: alert.message.clone(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl SystemAlertHandler for NotificationCenter {
    /// 实时摄入：每条 system_alert 事件合成一条未读通知并头部插入
    async fn on_system_alert(&self, alert: SystemAlertEvent) {
        // 仅在会话 token 存在期间摄入
        if self.bound_token.read().await.is_none() {
            debug!("System alert received without bound token, ignored");
            return;
        }
        let user_id = self
            .store
            .auth()
            .await
            .user_id()
            .unwrap_or_default()
            .to_string();
        let notification = self.synthesize(&alert, user_id);
        self.store
            .dispatch_notifications(NotificationsAction::Prepend(notification))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconnectConfig;
    use crate::domain::model::{LoginResponse, OrderRecord, UserProfile};
    use crate::error::SyncError;
    use crate::infrastructure::transport::testing::MemoryTransport;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// 网关桩：通知相关调用可配置失败
    #[derive(Default)]
    struct StubGateway {
        fail_writes: AtomicBool,
        fail_fetch: AtomicBool,
        mark_read_calls: AtomicUsize,
    }

    fn notification(id: &str, is_read: bool) -> Notification {
        Notification {
            id: id.to_string(),
            user_id: "u-1".to_string(),
            kind: NotificationKind::OrderDelivered,
            title: "title".to_string(),
            message: "message".to_string(),
            is_read,
            created_at: Utc::now(),
        }
    }

    #[async_trait]
    impl ApiGateway for StubGateway {
        async fn login(&self, _email: &str, _password: &str) -> Result<LoginResponse> {
            unimplemented!("not exercised")
        }

        async fn logout(&self) -> Result<()> {
            Ok(())
        }

        async fn fetch_current_user(&self) -> Result<UserProfile> {
            unimplemented!("not exercised")
        }

        async fn fetch_orders(&self) -> Result<Vec<OrderRecord>> {
            Ok(vec![])
        }

        async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(SyncError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(vec![notification("n-1", false), notification("n-2", true)])
        }

        async fn mark_notification_read(&self, _id: &str) -> Result<()> {
            self.mark_read_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(SyncError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }

        async fn mark_all_notifications_read(&self) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(SyncError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    fn center_with(
        gateway: Arc<StubGateway>,
    ) -> (
        Arc<NotificationCenter>,
        Arc<StateStore>,
        tokio::sync::mpsc::UnboundedReceiver<crate::toast::Toast>,
    ) {
        let store = Arc::new(StateStore::new());
        let (toasts, toast_rx) = ToastBus::new();
        let center = NotificationCenter::new(gateway, store.clone(), toasts);
        (center, store, toast_rx)
    }

    /// 测试：拉取成功整体替换并重算未读
    #[tokio::test]
    async fn test_fetch_replaces_and_recounts() {
        let (center, store, _toast_rx) = center_with(Arc::new(StubGateway::default()));

        center.fetch_notifications().await;

        let state = store.notifications().await;
        assert_eq!(state.notifications.len(), 2);
        assert_eq!(state.unread_count, 1);
        assert!(state.loaded);
    }

    /// 测试：拉取失败时既有状态不变，也不弹 toast
    #[tokio::test]
    async fn test_fetch_failure_is_silent() {
        let gateway = Arc::new(StubGateway::default());
        let (center, store, mut toast_rx) = center_with(gateway.clone());

        center.fetch_notifications().await;
        let before = store.notifications().await;

        gateway.fail_fetch.store(true, Ordering::SeqCst);
        center.fetch_notifications().await;

        assert_eq!(store.notifications().await, before);
        assert!(toast_rx.try_recv().is_err());
    }

    /// 测试：标记已读失败时状态不变并弹出错误提示
    #[tokio::test]
    async fn test_mark_read_failure_keeps_state_and_toasts() {
        let gateway = Arc::new(StubGateway::default());
        let (center, store, mut toast_rx) = center_with(gateway.clone());
        center.fetch_notifications().await;
        let before = store.notifications().await;

        gateway.fail_writes.store(true, Ordering::SeqCst);
        center.mark_as_read("n-1").await;

        assert_eq!(store.notifications().await, before);
        let toast = toast_rx.try_recv().unwrap();
        assert_eq!(toast.level, crate::toast::ToastLevel::Error);
    }

    /// 测试：标记已读成功后未读递减
    #[tokio::test]
    async fn test_mark_read_success_decrements_unread() {
        let (center, store, _toast_rx) = center_with(Arc::new(StubGateway::default()));
        center.fetch_notifications().await;

        center.mark_as_read("n-1").await;

        let state = store.notifications().await;
        assert_eq!(state.unread_count, 0);
        assert!(state.find("n-1").unwrap().is_read);
    }

    /// 测试：全部已读成功后未读清零
    #[tokio::test]
    async fn test_clear_all_success_zeroes_unread() {
        let (center, store, _toast_rx) = center_with(Arc::new(StubGateway::default()));
        center.fetch_notifications().await;

        center.clear_all().await;

        let state = store.notifications().await;
        assert_eq!(state.unread_count, 0);
        assert!(state.notifications.iter().all(|n| n.is_read));
    }

    /// 测试：同一 token 重复绑定不累积注册，一条告警只产生一条持久通知
    #[tokio::test]
    async fn test_bind_is_idempotent_per_token() {
        let (center, store, _toast_rx) = center_with(Arc::new(StubGateway::default()));
        let transport = Arc::new(MemoryTransport::new());
        let channel = RealtimeChannel::new(
            transport.clone(),
            ReconnectConfig {
                max_attempts: 5,
                delay_ms: 1,
            },
        );

        channel.connect("tok").await;
        // 模拟拥有方上下文重复进入
        center.bind_realtime(&channel, "tok").await;
        center.bind_realtime(&channel, "tok").await;
        center.bind_realtime(&channel, "tok").await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let handle = transport.take_handle().unwrap();
        handle
            .inject
            .send(r#"{"event":"system_alert","data":{"message":"Depot offline"}}"#.to_string())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let state = store.notifications().await;
        assert_eq!(state.notifications.len(), 1);
        assert_eq!(state.unread_count, 1);
        assert_eq!(state.notifications[0].title, "System alert");
        assert_eq!(state.notifications[0].kind, NotificationKind::SystemAlert);
        assert!(!state.notifications[0].is_read);
    }
}
