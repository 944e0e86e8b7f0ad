//! 瞬态通知（toast）分发
//!
//! toast 是面向用户的一次性提示，不进入持久通知列表。UI 作为外部协作方
//! 持有接收端；接收端不存在时消息被丢弃，不影响核心流程。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

/// toast 级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

/// 一条瞬态提示
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub message: String,
}

/// toast 总线
pub struct ToastBus {
    tx: mpsc::UnboundedSender<Toast>,
}

impl ToastBus {
    /// 创建总线，返回 (总线, UI 消费的接收端)
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Toast>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    pub fn info(&self, title: impl Into<String>, message: impl Into<String>) {
        self.push(ToastLevel::Info, title, message);
    }

    pub fn warning(&self, title: impl Into<String>, message: impl Into<String>) {
        self.push(ToastLevel::Warning, title, message);
    }

    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.push(ToastLevel::Error, title, message);
    }

    fn push(&self, level: ToastLevel, title: impl Into<String>, message: impl Into<String>) {
        let toast = Toast {
            level,
            title: title.into(),
            message: message.into(),
        };
        if self.tx.send(toast).is_err() {
            debug!("Toast receiver dropped, notice discarded");
        }
    }
}
