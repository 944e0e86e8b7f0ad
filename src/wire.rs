//! Wire 风格的依赖构建模块
//!
//! 按依赖顺序显式构建所有组件并返回应用上下文，供宿主 UI 持有。
//! 通道、桥接等服务都是注入的实例，没有隐藏的全局可变状态。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::SyncBridge;
use crate::channel::RealtimeChannel;
use crate::config::SyncConfig;
use crate::domain::gateway::ApiGateway;
use crate::error::Result;
use crate::infrastructure::api::{ApiClient, TokenStore};
use crate::infrastructure::transport::WsTransport;
use crate::notify::NotificationCenter;
use crate::session::SessionManager;
use crate::store::StateStore;
use crate::toast::{Toast, ToastBus};

/// 应用上下文 - 包含所有已初始化的服务
pub struct SyncContext {
    pub config: SyncConfig,
    pub store: Arc<StateStore>,
    pub api: Arc<dyn ApiGateway>,
    pub channel: Arc<RealtimeChannel>,
    pub session: Arc<SessionManager>,
    pub notifications: Arc<NotificationCenter>,
    pub bridge: Arc<SyncBridge>,
    /// UI 消费的瞬态提示流
    pub toast_rx: mpsc::UnboundedReceiver<Toast>,
    bridge_task: JoinHandle<()>,
}

impl SyncContext {
    /// 拆除上下文：断开通道、停止桥接驱动循环
    pub async fn shutdown(self) {
        self.bridge.shutdown().await;
        self.bridge_task.abort();
    }
}

/// 构建应用上下文
///
/// 按依赖顺序构建：token 存储 → API 客户端 → 状态存储 → toast 总线 →
/// 实时通道（WebSocket 传输）→ 通知聚合器 → 会话管理 → 同步桥接。
pub async fn initialize(config: SyncConfig) -> Result<SyncContext> {
    let tokens = TokenStore::new();
    let (auth_tx, auth_rx) = mpsc::unbounded_channel();

    let api: Arc<dyn ApiGateway> = Arc::new(ApiClient::new(
        &config.api_base_url,
        tokens.clone(),
        auth_tx,
    )?);

    let store = Arc::new(StateStore::new());
    let (toasts, toast_rx) = ToastBus::new();

    let transport = Arc::new(WsTransport::new(&config.channel_url)?);
    let channel = RealtimeChannel::new(transport, config.reconnect.clone());

    let notifications = NotificationCenter::new(api.clone(), store.clone(), toasts.clone());
    let session = SessionManager::new(api.clone(), tokens, store.clone());

    let bridge = SyncBridge::new(
        channel.clone(),
        store.clone(),
        toasts,
        notifications.clone(),
        session.clone(),
    );
    let bridge_task = tokio::spawn(bridge.clone().run(session.watch(), auth_rx));

    Ok(SyncContext {
        config,
        store,
        api,
        channel,
        session,
        notifications,
        bridge,
        toast_rx,
        bridge_task,
    })
}
