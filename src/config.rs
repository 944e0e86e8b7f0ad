//! 配置加载模块
//!
//! 提供同步核心的统一配置：
//! - 从 TOML 文件加载基础配置
//! - 环境变量覆盖（COURIER_* 前缀）
//! - 进程级默认配置单例

use std::env;
use std::fs;
use std::time::Duration;

use anyhow::Context;
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::error::{Result, SyncError};

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（trace/debug/info/warn/error）
    pub level: String,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_file: bool,
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

/// 实时通道重连策略配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// 传输层掉线后的最大自动重连次数
    pub max_attempts: u32,
    /// 两次重连之间的固定等待（毫秒）
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 2000,
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// 同步核心配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// REST 网关基础地址
    pub api_base_url: String,
    /// 实时通道地址（ws/wss）
    pub channel_url: String,
    pub reconnect: ReconnectConfig,
    pub logging: LoggingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            channel_url: "ws://localhost:8080/realtime".to_string(),
            reconnect: ReconnectConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SyncConfig {
    /// 应用环境变量覆盖
    ///
    /// 优先级：环境变量 > 配置文件 > 内置默认值
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("COURIER_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(url) = env::var("COURIER_CHANNEL_URL") {
            self.channel_url = url;
        }
        if let Ok(level) = env::var("COURIER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(attempts) = env::var("COURIER_RECONNECT_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            self.reconnect.max_attempts = attempts;
        }
    }
}

/// 加载配置
///
/// # 参数
/// * `path` - 配置文件路径（可选），为 None 时只使用默认值和环境变量
pub fn load_config(path: Option<&str>) -> Result<SyncConfig> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("无法读取配置文件: {}", path))?;
            toml::from_str::<SyncConfig>(&content)
                .map_err(|e| SyncError::Config(format!("无效的配置格式 {}: {}", path, e)))?
        }
        None => SyncConfig::default(),
    };

    config.apply_env_overrides();
    Ok(config)
}

static SHARED_CONFIG: OnceCell<SyncConfig> = OnceCell::new();

/// 获取进程级共享配置（首次调用时加载）
///
/// 配置文件路径从环境变量 COURIER_CONFIG 读取，未设置时使用默认配置。
pub fn shared_config() -> &'static SyncConfig {
    SHARED_CONFIG.get_or_init(|| {
        let path = env::var("COURIER_CONFIG").ok();
        match load_config(path.as_deref()) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load config, falling back to defaults");
                SyncConfig::default()
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试：默认配置的重连策略为 5 次
    #[test]
    fn test_default_reconnect_policy() {
        let config = SyncConfig::default();
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.delay(), Duration::from_millis(2000));
    }

    /// 测试：TOML 片段只覆盖给出的字段
    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            api_base_url = "https://courier.example.com/api"

            [reconnect]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://courier.example.com/api");
        assert_eq!(config.reconnect.max_attempts, 3);
        // 未给出的字段保持默认
        assert_eq!(config.reconnect.delay_ms, 2000);
        assert_eq!(config.logging.level, "info");
    }
}
