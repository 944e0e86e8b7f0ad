//! 实时通道事件定义
//!
//! 通道上的消息统一使用 `{ "event": <名称>, "data": <载荷> }` 的 JSON 文本帧。
//! 入站事件在进入桥接层之前完成强类型解析，未知事件名或不合法的载荷
//! 由调用方记录日志后丢弃，绝不隐式信任。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::model::OrderStatus;
use crate::error::{Result, SyncError};

/// 入站事件名
pub const EVENT_ORDER_UPDATE: &str = "order_update";
pub const EVENT_DRIVER_LOCATION: &str = "driver_location";
pub const EVENT_SYSTEM_ALERT: &str = "system_alert";

/// 出站事件名
pub const EVENT_UPDATE_LOCATION: &str = "update_location";
pub const EVENT_STATUS_CHANGE: &str = "status_change";

/// 订单更新补丁（order_update 载荷）
///
/// `id` 为匹配键，其余字段可缺省；未声明的字段保留在 `extra` 中随补丁合并。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 司机位置更新（driver_location 载荷）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationUpdate {
    pub driver_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// 系统告警事件（system_alert 载荷）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemAlertEvent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
}

/// 入站事件（服务端 → 客户端）
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    OrderUpdate(OrderPatch),
    DriverLocation(DriverLocationUpdate),
    SystemAlert(SystemAlertEvent),
}

/// 原始事件信封
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ServerEvent {
    /// 解析一条入站文本帧
    ///
    /// 未知事件名返回 `SyncError::UnknownEvent`，载荷不合法返回 `SyncError::Codec`，
    /// 两者均由通道泵记录日志后丢弃。
    pub fn parse(frame: &str) -> Result<ServerEvent> {
        let envelope: Envelope = serde_json::from_str(frame)?;
        match envelope.event.as_str() {
            EVENT_ORDER_UPDATE => Ok(ServerEvent::OrderUpdate(serde_json::from_value(
                envelope.data,
            )?)),
            EVENT_DRIVER_LOCATION => Ok(ServerEvent::DriverLocation(serde_json::from_value(
                envelope.data,
            )?)),
            EVENT_SYSTEM_ALERT => Ok(ServerEvent::SystemAlert(serde_json::from_value(
                envelope.data,
            )?)),
            other => Err(SyncError::UnknownEvent(other.to_string())),
        }
    }

    /// 事件名（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::OrderUpdate(_) => EVENT_ORDER_UPDATE,
            ServerEvent::DriverLocation(_) => EVENT_DRIVER_LOCATION,
            ServerEvent::SystemAlert(_) => EVENT_SYSTEM_ALERT,
        }
    }
}

/// 位置上报载荷（update_location）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReport {
    pub order_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

/// 状态变更载荷（status_change）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub order_id: String,
    pub status: OrderStatus,
}

/// 出站命令（客户端 → 服务端），即发即弃，无确认或重试语义
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    UpdateLocation(LocationReport),
    StatusChange(StatusChange),
}

impl ClientCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::UpdateLocation(_) => EVENT_UPDATE_LOCATION,
            ClientCommand::StatusChange(_) => EVENT_STATUS_CHANGE,
        }
    }

    /// 序列化为通道文本帧
    pub fn to_frame(&self) -> Result<String> {
        let data = match self {
            ClientCommand::UpdateLocation(report) => serde_json::to_value(report)?,
            ClientCommand::StatusChange(change) => serde_json::to_value(change)?,
        };
        let envelope = Envelope {
            event: self.name().to_string(),
            data,
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}
