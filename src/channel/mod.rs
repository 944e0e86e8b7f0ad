//! 实时通道
//!
//! 每个已认证会话维持至多一条双工连接，独占传输句柄，向上暴露固定
//! 事件集的发布/订阅接口。通道实例由组合根显式构造并注入，
//! 不存在全局单例。
//!
//! 重连语义：传输掉线后由通道泵自动重连，次数有上限（配置默认 5 次）；
//! 耗尽后进入可观测的 `Lost` 状态而不是静默放弃。传输层的重连不会
//! 重复注册处理器——注册表只随显式 `connect()`/`disconnect()` 变化。

pub mod handlers;

pub use handlers::{DriverLocationHandler, OrderUpdateHandler, SystemAlertHandler};

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ReconnectConfig;
use crate::domain::events::{ClientCommand, LocationReport, StatusChange};
use crate::domain::model::OrderStatus;
use crate::infrastructure::transport::ChannelTransport;
use handlers::HandlerRegistry;

/// 出站命令队列容量
const OUTGOING_CAPACITY: usize = 64;

/// 通道连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// 无活跃连接（初始态，或显式断开后）
    Disconnected,
    /// 连接已建立
    Connected,
    /// 重连次数耗尽，连接永久丢失（需要显式 connect 恢复）
    Lost,
}

struct ActiveConnection {
    pump: JoinHandle<()>,
    outgoing: mpsc::Sender<String>,
}

/// 实时通道
pub struct RealtimeChannel {
    transport: Arc<dyn ChannelTransport>,
    reconnect: ReconnectConfig,
    handlers: Arc<HandlerRegistry>,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    conn: RwLock<Option<ActiveConnection>>,
}

impl RealtimeChannel {
    pub fn new(transport: Arc<dyn ChannelTransport>, reconnect: ReconnectConfig) -> Arc<Self> {
        let (status_tx, _status_rx) = watch::channel(ConnectionStatus::Disconnected);
        Arc::new(Self {
            transport,
            reconnect,
            handlers: Arc::new(HandlerRegistry::default()),
            status_tx: Arc::new(status_tx),
            conn: RwLock::new(None),
        })
    }

    /// 建立连接
    ///
    /// 已连接时为无操作（保证至多一条活跃连接）。连接错误只记录日志，
    /// 不向调用方传播；初次建立失败同样消耗重连预算。
    pub async fn connect(&self, token: &str) {
        let mut guard = self.conn.write().await;
        if let Some(active) = guard.as_ref() {
            if !active.pump.is_finished() {
                debug!("Channel already connected, connect ignored");
                return;
            }
            // 泵已结束（Lost）——允许重新建立
        }

        let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_CAPACITY);
        let pump = tokio::spawn(run_pump(
            Arc::clone(&self.transport),
            token.to_string(),
            Arc::clone(&self.handlers),
            Arc::clone(&self.status_tx),
            self.reconnect.clone(),
            outgoing_rx,
        ));
        *guard = Some(ActiveConnection {
            pump,
            outgoing: outgoing_tx,
        });
    }

    /// 断开连接（幂等）
    ///
    /// 会话失去认证时必须调用；这是唯一的清理路径，同时清空全部
    /// 处理器注册，保证再次进入时不会重复注册。
    pub async fn disconnect(&self) {
        let mut guard = self.conn.write().await;
        match guard.take() {
            Some(active) => {
                active.pump.abort();
                info!("Realtime channel disconnected");
            }
            None => {
                debug!("Channel already disconnected");
            }
        }
        self.handlers.clear().await;
        self.status_tx.send_replace(ConnectionStatus::Disconnected);
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.status(), ConnectionStatus::Connected)
    }

    /// 订阅连接状态变化（含重连耗尽后的 Lost）
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// 注册订单更新处理器（按注册顺序、事件到达顺序调用）
    pub async fn on_order_update(&self, handler: Arc<dyn OrderUpdateHandler>) {
        self.handlers.register_order_update(handler).await;
    }

    /// 注册系统告警处理器
    pub async fn on_system_alert(&self, handler: Arc<dyn SystemAlertHandler>) {
        self.handlers.register_system_alert(handler).await;
    }

    /// 注册司机位置处理器
    pub async fn on_driver_location(&self, handler: Arc<dyn DriverLocationHandler>) {
        self.handlers.register_driver_location(handler).await;
    }

    /// 上报位置（即发即弃）
    pub async fn emit_location_update(&self, order_id: &str, latitude: f64, longitude: f64) {
        self.emit(ClientCommand::UpdateLocation(LocationReport {
            order_id: order_id.to_string(),
            latitude,
            longitude,
            timestamp: Utc::now(),
        }))
        .await;
    }

    /// 上报订单状态变更（即发即弃）
    pub async fn emit_status_change(&self, order_id: &str, status: OrderStatus) {
        self.emit(ClientCommand::StatusChange(StatusChange {
            order_id: order_id.to_string(),
            status,
        }))
        .await;
    }

    async fn emit(&self, command: ClientCommand) {
        let guard = self.conn.read().await;
        let Some(active) = guard.as_ref() else {
            debug!(event = command.name(), "Emit ignored, channel not connected");
            return;
        };
        match command.to_frame() {
            Ok(frame) => {
                if active.outgoing.send(frame).await.is_err() {
                    debug!(event = command.name(), "Emit dropped, channel pump stopped");
                }
            }
            Err(err) => {
                warn!(error = %err, event = command.name(), "Failed to encode outbound command");
            }
        }
    }
}

/// 通道泵：打开传输、转发出入站帧、掉线后按预算重连
async fn run_pump(
    transport: Arc<dyn ChannelTransport>,
    token: String,
    handlers: Arc<HandlerRegistry>,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    policy: ReconnectConfig,
    mut outgoing_rx: mpsc::Receiver<String>,
) {
    let mut attempts_left = policy.max_attempts;
    loop {
        match transport.open(&token).await {
            Ok(mut conn) => {
                info!("Realtime channel connected");
                status_tx.send_replace(ConnectionStatus::Connected);
                // 成功建立后重置重连预算
                attempts_left = policy.max_attempts;

                loop {
                    tokio::select! {
                        frame = conn.incoming.recv() => match frame {
                            Some(text) => handlers.dispatch_frame(&text).await,
                            None => break,
                        },
                        command = outgoing_rx.recv() => match command {
                            Some(frame) => {
                                if conn.outgoing.send(frame).await.is_err() {
                                    debug!("Transport outgoing closed, frame dropped");
                                }
                            }
                            // 出站入口被释放说明通道已拆除
                            None => return,
                        },
                    }
                }

                warn!("Realtime channel transport dropped");
                status_tx.send_replace(ConnectionStatus::Disconnected);
            }
            Err(err) => {
                warn!(error = %err, "Realtime channel connect failed");
            }
        }

        if attempts_left == 0 {
            warn!(
                max_attempts = policy.max_attempts,
                "Reconnect attempts exhausted, channel permanently lost"
            );
            status_tx.send_replace(ConnectionStatus::Lost);
            return;
        }
        attempts_left -= 1;
        tokio::time::sleep(policy.delay()).await;
    }
}
