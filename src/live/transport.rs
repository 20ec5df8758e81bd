//! Live transport abstraction
//!
//! A transport produces a [`Link`]: a pair of text-frame channels backed by
//! two pump tasks, one writing outbound frames and one reading inbound ones.
//! The link is considered closed once its inbound channel ends.

use crate::error::{IhppError, IhppResult};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// An open connection, as seen by the multiplexer
pub struct Link {
    /// Frames to send to the server
    pub outbound: mpsc::UnboundedSender<String>,
    /// Frames received from the server; `None` once the connection closed
    pub inbound: mpsc::UnboundedReceiver<IhppResult<String>>,
}

/// Something that can open a live connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new connection
    async fn connect(&self) -> IhppResult<Link>;

    /// Human-readable endpoint for logs
    fn endpoint(&self) -> String;
}

/// WebSocket transport
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Derive the WebSocket URL from an HTTP API base URL
    ///
    /// `http` becomes `ws`, `https` becomes `wss`, and `path` replaces the
    /// base URL's path.
    pub fn url_for(api_url: &str, path: &str) -> IhppResult<String> {
        let (scheme, rest) = if let Some(rest) = api_url.strip_prefix("https://") {
            ("wss", rest)
        } else if let Some(rest) = api_url.strip_prefix("http://") {
            ("ws", rest)
        } else {
            return Err(IhppError::User(format!(
                "server.api_url must start with http:// or https://, got {}",
                api_url
            )));
        };

        let authority = rest.split('/').next().unwrap_or(rest);
        let path = path.trim_start_matches('/');
        Ok(format!("{}://{}/{}", scheme, authority, path))
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self) -> IhppResult<Link> {
        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(IhppError::transport)?;
        let (mut sink, mut stream) = socket.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    debug!("WebSocket write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let item = match frame {
                    Ok(Message::Text(text)) => Ok(text),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => Err(IhppError::transport(e)),
                };
                let failed = item.is_err();
                if inbound_tx.send(item).is_err() || failed {
                    break;
                }
            }
            debug!("WebSocket read pump stopped");
        });

        Ok(Link { outbound, inbound })
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

/// Server end of a [`ChannelTransport`] connection
pub struct ChannelPeer {
    /// Frames the client sent
    pub received: mpsc::UnboundedReceiver<String>,
    /// Push frames to the client; drop to close the connection
    pub sender: mpsc::UnboundedSender<IhppResult<String>>,
}

impl ChannelPeer {
    /// Push a text frame to the client
    pub fn push(&self, text: impl Into<String>) -> IhppResult<()> {
        self.sender
            .send(Ok(text.into()))
            .map_err(|_| IhppError::TransportClosed)
    }
}

/// In-process transport; every `connect` hands a [`ChannelPeer`] to the
/// acceptor returned by [`ChannelTransport::new`]
pub struct ChannelTransport {
    acceptor: mpsc::UnboundedSender<ChannelPeer>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelPeer>) {
        let (acceptor, peers) = mpsc::unbounded_channel();
        (Self { acceptor }, peers)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&self) -> IhppResult<Link> {
        let (outbound, received) = mpsc::unbounded_channel();
        let (sender, inbound) = mpsc::unbounded_channel();

        self.acceptor
            .send(ChannelPeer { received, sender })
            .map_err(|_| IhppError::TransportClosed)?;

        Ok(Link { outbound, inbound })
    }

    fn endpoint(&self) -> String {
        "in-process".to_string()
    }
}
