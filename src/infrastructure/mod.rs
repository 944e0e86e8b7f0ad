//! 基础设施层：REST 网关客户端与实时通道传输

pub mod api;
pub mod transport;

pub use api::{ApiClient, AuthEvent, TokenStore};
pub use transport::{ChannelTransport, TransportConnection, WsTransport};
