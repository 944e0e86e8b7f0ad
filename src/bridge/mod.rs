//! 同步桥接
//!
//! 会话生命周期、实时通道与状态存储之间的胶水层。状态机只由
//! `authenticated × token 是否存在` 驱动：
//!
//! - Disconnected（初始）：无通道、无订阅
//! - Connected：认证且有 token 时进入，connect 后恰好订阅一次
//!   （显式 subscribed 状态而不是依赖 UI 框架的 effect 比对）
//! - 回到 Disconnected：认证失效或上下文拆除，必经 `disconnect()`，
//!   这是唯一清理路径，保证不泄漏连接、重入不重复注册
//!
//! 桥接不区分首次连接与传输层静默重连：订阅只在显式 connect 调用后
//! 注册一次。


use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, info, warn};

use crate::channel::{
    DriverLocationHandler, OrderUpdateHandler, RealtimeChannel, SystemAlertHandler,
};
use crate::domain::events::{DriverLocationUpdate, OrderPatch, SystemAlertEvent};
use crate::infrastructure::api::AuthEvent;
use crate::notify::NotificationCenter;
use crate::session::{SessionManager, SessionState};
use crate::store::{DriversAction, OrdersAction, StateStore};
use crate::toast::ToastBus;

#[derive(Debug, Clone, PartialEq)]
enum BridgeState {
    Disconnected,
    Connected { token: String },
}

/// 同步桥接
pub struct SyncBridge {
    channel: Arc<RealtimeChannel>,
    store: Arc<StateStore>,
    toasts: Arc<ToastBus>,
    notifications: Arc<NotificationCenter>,
    session: Arc<SessionManager>,
    state: RwLock<BridgeState>,
}

impl SyncBridge {
    pub fn new(
        channel: Arc<RealtimeChannel>,
        store: Arc<StateStore>,
        toasts: Arc<ToastBus>,
        notifications: Arc<NotificationCenter>,
        session: Arc<SessionManager>,
    ) -> Arc<Self> {
        Arc::new(Self {
            channel,
            store,
            toasts,
            notifications,
            session,
            state: RwLock::new(BridgeState::Disconnected),
        })
    }

    /// 驱动循环：消费会话状态变化与全局认证事件
    ///
    /// 循环退出（上下文拆除）时执行与登出相同的清理。
    pub async fn run(
        self: Arc<Self>,
        mut session_rx: watch::Receiver<SessionState>,
        mut auth_rx: mpsc::UnboundedReceiver<AuthEvent>,
    ) {
        let initial = session_rx.borrow_and_update().clone();
        self.apply_session(&initial).await;

        loop {
            tokio::select! {
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = session_rx.borrow_and_update().clone();
                    self.apply_session(&state).await;
                }
                event = auth_rx.recv() => match event {
                    Some(AuthEvent::ForcedLogout) => {
                        warn!("Authentication rejected by server, forcing logout");
                        self.session.force_logout().await;
                    }
                    None => break,
                },
            }
        }

        self.shutdown().await;
    }

    /// 应用一次会话状态
    ///
    /// 同一 token 的重复进入为无操作；token 变化时先走完整清理路径
    /// 再重新建立。
    pub async fn apply_session(self: &Arc<Self>, session: &SessionState) {
        let mut state = self.state.write().await;
        let target = if session.authenticated {
            session.token.clone()
        } else {
            None
        };

        match (&*state, target) {
            (BridgeState::Connected { token }, Some(new_token)) if *token == new_token => {
                debug!("Session unchanged, bridge already connected");
            }
            (_, Some(new_token)) => {
                if matches!(*state, BridgeState::Connected { .. }) {
                    self.teardown().await;
                }
                info!("Session authenticated, connecting realtime channel");
                self.channel.connect(&new_token).await;
                self.subscribe(&new_token).await;
                *state = BridgeState::Connected { token: new_token };
            }
            (BridgeState::Connected { .. }, None) => {
                info!("Session ended, disconnecting realtime channel");
                self.teardown().await;
                *state = BridgeState::Disconnected;
            }
            (BridgeState::Disconnected, None) => {}
        }
    }

    /// 拆除桥接（等价于会话结束的清理）
    pub async fn shutdown(&self) {
        let mut state = self.state.write().await;
        if matches!(*state, BridgeState::Connected { .. }) {
            self.teardown().await;
        }
        *state = BridgeState::Disconnected;
    }

    /// 每次成功 connect 后恰好执行一次的订阅注册
    async fn subscribe(self: &Arc<Self>, token: &str) {
        self.channel
            .on_order_update(Arc::clone(self) as Arc<dyn OrderUpdateHandler>)
            .await;
        self.channel
            .on_system_alert(Arc::clone(self) as Arc<dyn SystemAlertHandler>)
            .await;
        self.channel
            .on_driver_location(Arc::clone(self) as Arc<dyn DriverLocationHandler>)
            .await;
        // 持久通知的摄入方与上面的瞬态提示是解耦的两个消费者
        self.notifications.bind_realtime(&self.channel, token).await;
    }

    async fn teardown(&self) {
        self.channel.disconnect().await;
        self.notifications.unbind().await;
    }
}

#[async_trait]
impl OrderUpdateHandler for SyncBridge {
    async fn on_order_update(&self, patch: OrderPatch) {
        // 提示文案优先用补丁里的单号，其次是已有记录，最后回退到 id
        let label = match patch.order_number.clone() {
            Some(number) => number,
            None => self
                .store
                .orders()
                .await
                .find(&patch.id)
                .map(|o| o.order_number.clone())
                .unwrap_or_else(|| patch.id.clone()),
        };
        let status = patch.status;

        self.store.dispatch_orders(OrdersAction::Patch(patch)).await;

        // 瞬态回显，不产生持久记录
        if let Some(status) = status {
            self.toasts
                .info("Order update", format!("Order {} is now {}", label, status));
        }
    }
}

#[async_trait]
impl SystemAlertHandler for SyncBridge {
    async fn on_system_alert(&self, alert: SystemAlertEvent) {
        let title = alert
            .title
            .unwrap_or_else(|| "System alert".to_string());
        self.toasts.warning(title, alert.message);
    }
}

#[async_trait]
impl DriverLocationHandler for SyncBridge {
    async fn on_driver_location(&self, update: DriverLocationUpdate) {
        self.store
            .dispatch_drivers(DriversAction::LocationUpdate(update))
            .await;
    }
}
