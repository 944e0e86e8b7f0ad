//! 通道事件处理器注册表
//!
//! 处理器按注册顺序持有，入站事件按到达顺序逐个 await 调用，
//! 不做重排或合并。注册表随 `disconnect()` 整体清空。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::events::{DriverLocationUpdate, OrderPatch, ServerEvent, SystemAlertEvent};
use crate::error::SyncError;

/// 订单更新事件处理器
#[async_trait]
pub trait OrderUpdateHandler: Send + Sync {
    async fn on_order_update(&self, patch: OrderPatch);
}

/// 系统告警事件处理器
#[async_trait]
pub trait SystemAlertHandler: Send + Sync {
    async fn on_system_alert(&self, alert: SystemAlertEvent);
}

/// 司机位置事件处理器
#[async_trait]
pub trait DriverLocationHandler: Send + Sync {
    async fn on_driver_location(&self, update: DriverLocationUpdate);
}

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    order_update: RwLock<Vec<Arc<dyn OrderUpdateHandler>>>,
    system_alert: RwLock<Vec<Arc<dyn SystemAlertHandler>>>,
    driver_location: RwLock<Vec<Arc<dyn DriverLocationHandler>>>,
}

impl HandlerRegistry {
    pub async fn register_order_update(&self, handler: Arc<dyn OrderUpdateHandler>) {
        self.order_update.write().await.push(handler);
    }

    pub async fn register_system_alert(&self, handler: Arc<dyn SystemAlertHandler>) {
        self.system_alert.write().await.push(handler);
    }

    pub async fn register_driver_location(&self, handler: Arc<dyn DriverLocationHandler>) {
        self.driver_location.write().await.push(handler);
    }

    pub async fn clear(&self) {
        self.order_update.write().await.clear();
        self.system_alert.write().await.clear();
        self.driver_location.write().await.clear();
    }

    /// 解析并分发一条入站帧；未知事件与不合法载荷记录日志后丢弃
    pub async fn dispatch_frame(&self, frame: &str) {
        match ServerEvent::parse(frame) {
            Ok(event) => self.dispatch(event).await,
            Err(SyncError::UnknownEvent(name)) => {
                debug!(event = %name, "Dropping unknown channel event");
            }
            Err(err) => {
                debug!(error = %err, "Dropping malformed channel frame");
            }
        }
    }

    async fn dispatch(&self, event: ServerEvent) {
        match event {
            ServerEvent::OrderUpdate(patch) => {
                let handlers = self.order_update.read().await.clone();
                if handlers.is_empty() {
                    debug!(event = "order_update", "No handler registered, event dropped");
                }
                for handler in handlers {
                    handler.on_order_update(patch.clone()).await;
                }
            }
            ServerEvent::SystemAlert(alert) => {
                let handlers = self.system_alert.read().await.clone();
                if handlers.is_empty() {
                    debug!(event = "system_alert", "No handler registered, event dropped");
                }
                for handler in handlers {
                    handler.on_system_alert(alert.clone()).await;
                }
            }
            ServerEvent::DriverLocation(update) => {
                let handlers = self.driver_location.read().await.clone();
                if handlers.is_empty() {
                    debug!(event = "driver_location", "No handler registered, event dropped");
                }
                for handler in handlers {
                    handler.on_driver_location(update.clone()).await;
                }
            }
        }
    }
}
