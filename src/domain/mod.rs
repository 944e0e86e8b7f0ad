//! 领域层：核心模型、通道事件与网关抽象

pub mod events;
pub mod gateway;
pub mod model;
