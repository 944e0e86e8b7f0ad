//! 同步核心统一错误类型定义

use thiserror::Error;

/// 同步核心错误类型
#[derive(Debug, Error)]
pub enum SyncError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 传输层错误（连接建立、帧收发失败）
    #[error("Transport error: {0}")]
    Transport(String),

    /// 网关返回非成功状态
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 认证失败（401 等价状态，触发全局登出策略）
    #[error("Authentication rejected by server")]
    AuthRejected,

    /// 未知的通道事件名
    #[error("Unknown channel event: {0}")]
    UnknownEvent(String),

    /// 消息编解码错误
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// HTTP 客户端错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 同步核心结果类型
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// 判断错误是否为认证失败（用于跨切面的强制登出策略）
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, SyncError::AuthRejected)
    }
}
