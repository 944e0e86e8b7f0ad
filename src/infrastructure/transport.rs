//! 实时通道传输层
//!
//! `ChannelTransport` 是通道与具体传输之间的接缝：生产实现为 WebSocket
//! 客户端（`WsTransport`），测试中以内存传输替换。传输层只负责帧的收发，
//! 事件语义由通道层处理。

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, SyncError};

/// 帧通道容量（入站/出站各自独立）
const FRAME_CHANNEL_CAPACITY: usize = 64;

/// 一条已建立的传输连接
///
/// `incoming` 结束（返回 None）即传输掉线；`outgoing` 为即发即弃的
/// 出站帧入口。
pub struct TransportConnection {
    pub incoming: mpsc::Receiver<String>,
    pub outgoing: mpsc::Sender<String>,
}

/// 传输层接缝
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// 以连接时凭证 `token` 打开一条新连接
    async fn open(&self, token: &str) -> Result<TransportConnection>;
}

/// WebSocket 传输实现
pub struct WsTransport {
    endpoint: Url,
}

impl WsTransport {
    pub fn new(channel_url: &str) -> Result<Self> {
        let endpoint = Url::parse(channel_url)
            .map_err(|e| SyncError::Config(format!("invalid channel_url: {}", e)))?;
        Ok(Self { endpoint })
    }

    fn authenticated_url(&self, token: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("token", token);
        url
    }
}

#[async_trait]
impl ChannelTransport for WsTransport {
    async fn open(&self, token: &str) -> Result<TransportConnection> {
        let url = self.authenticated_url(token);
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (incoming_tx, incoming_rx) = mpsc::channel::<String>(FRAME_CHANNEL_CAPACITY);
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(FRAME_CHANNEL_CAPACITY);

        // 读泵：文本帧进入 incoming，连接关闭或出错时结束（incoming 随之结束）
        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if incoming_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("WebSocket closed by server");
                        break;
                    }
                    // 协议层控制帧（ping/pong）由 tungstenite 处理，二进制帧忽略
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "WebSocket read failed");
                        break;
                    }
                }
            }
        });

        // 写泵：outgoing 的帧写入 sink，入口关闭后优雅关闭连接
        tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if let Err(err) = sink.send(Message::Text(frame)).await {
                    warn!(error = %err, "WebSocket write failed");
                    break;
                }
            }
            if let Err(err) = sink.close().await {
                debug!(error = %err, "WebSocket close failed");
            }
        });

        Ok(TransportConnection {
            incoming: incoming_rx,
            outgoing: outgoing_tx,
        })
    }
}
