//! Courier 配送平台客户端实时状态同步核心
//!
//! 提供会话门控的实时通道、纯 reducer 驱动的状态切片、
//! 事件到状态的同步桥接以及通知聚合能力。UI、路由等展示层
//! 作为外部协作方消费本 crate 暴露的快照与事件流。

pub mod bridge;
pub mod channel;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;
pub mod notify;
pub mod session;
pub mod store;
pub mod toast;
pub mod wire;

pub use bridge::SyncBridge;
pub use channel::{ConnectionStatus, RealtimeChannel};
pub use config::{ReconnectConfig, SyncConfig, load_config, shared_config};
pub use error::{Result, SyncError};
pub use logging::init_tracing_from_config;
pub use notify::NotificationCenter;
pub use session::{SessionManager, SessionState};
pub use store::StateStore;
pub use toast::{Toast, ToastBus, ToastLevel};
pub use wire::{SyncContext, initialize};
