use crate::core::errors::ExchangeError;
use crate::core::kernel::codec::WsCodec;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, instrument, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
        }
    }
}

/// WebSocket session trait - pure transport layer
///
/// One session is one logical connection that can be re-established with
/// `connect` after a failure. Every method takes `&mut self`, so whoever owns
/// the session is the single writer.
#[async_trait]
pub trait WsSession<C: WsCodec>: Send + Sync {
    /// Connect (or reconnect) the underlying transport
    async fn connect(&mut self) -> Result<(), ExchangeError>;

    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError>;

    /// Receive the next raw message
    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ExchangeError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;

    fn codec(&self) -> &C;

    /// Encode a named event with the codec and send it
    async fn emit(&mut self, event: &str, payload: &Value) -> Result<(), ExchangeError> {
        let message = self.codec().encode_event(event, payload)?;
        self.send_raw(message).await
    }

    /// Get the next decoded frame
    async fn next_message(&mut self) -> Option<Result<C::Message, ExchangeError>> {
        loop {
            match self.next_raw().await? {
                Ok(raw) => match self.codec().decode_message(raw) {
                    Ok(Some(decoded)) => return Some(Ok(decoded)),
                    Ok(None) => {} // Codec chose to ignore this message
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Tungstenite-based WebSocket implementation
pub struct TungsteniteWs<C: WsCodec> {
    url: String,
    write: Option<SplitSink<WsStream, Message>>,
    read: Option<SplitStream<WsStream>>,
    connected: bool,
    exchange_name: String,
    codec: C,
    config: WsConfig,
}

impl<C: WsCodec> TungsteniteWs<C> {
    /// Create a new WebSocket session with the specified codec
    ///
    /// # Arguments
    /// * `url` - The WebSocket URL to connect to
    /// * `exchange_name` - Name of the exchange for logging/tracing
    /// * `codec` - The codec to handle message encoding/decoding
    pub fn new(url: String, exchange_name: String, codec: C) -> Self {
        Self {
            url,
            write: None,
            read: None,
            connected: false,
            exchange_name,
            codec,
            config: WsConfig::default(),
        }
    }

    /// Set custom WebSocket configuration
    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn mark_disconnected(&mut self) {
        self.connected = false;
        self.write = None;
        self.read = None;
    }
}

#[async_trait]
impl<C: WsCodec> WsSession<C> for TungsteniteWs<C> {
    #[instrument(skip(self), fields(exchange = %self.exchange_name, url = %self.url))]
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        self.mark_disconnected();

        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let (ws_stream, _) = tokio::time::timeout(connect_timeout, connect_async(&self.url))
            .await
            .map_err(|_| ExchangeError::TransportError("WebSocket connection timeout".to_string()))?
            .map_err(|e| {
                ExchangeError::TransportError(format!("WebSocket connection failed: {}", e))
            })?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;
        debug!("websocket transport open");

        Ok(())
    }

    #[instrument(skip(self, msg), fields(exchange = %self.exchange_name))]
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        if !self.connected {
            return Err(ExchangeError::TransportError(
                "WebSocket not connected".to_string(),
            ));
        }

        let write = self.write.as_mut().ok_or_else(|| {
            ExchangeError::TransportError("WebSocket write stream not available".to_string())
        })?;

        if let Err(e) = write.send(msg).await {
            self.mark_disconnected();
            return Err(ExchangeError::TransportError(format!(
                "Failed to send WebSocket message: {}",
                e
            )));
        }

        Ok(())
    }

    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
        loop {
            if !self.connected {
                return Some(Err(ExchangeError::TransportError(
                    "WebSocket not connected".to_string(),
                )));
            }

            let read = self.read.as_mut()?;

            match read.next().await {
                Some(Ok(message)) => match message {
                    Message::Close(_) => {
                        self.mark_disconnected();
                        return Some(Ok(message));
                    }
                    Message::Ping(data) => {
                        // Auto-respond to pings at transport level
                        if let Err(e) = self.send_raw(Message::Pong(data)).await {
                            warn!("Failed to send pong response: {}", e);
                        }
                    }
                    Message::Pong(_) | Message::Frame(_) => {}
                    _ => return Some(Ok(message)),
                },
                Some(Err(e)) => {
                    self.mark_disconnected();
                    return Some(Err(ExchangeError::TransportError(format!(
                        "WebSocket error: {}",
                        e
                    ))));
                }
                None => {
                    self.mark_disconnected();
                    return None;
                }
            }
        }
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn close(&mut self) -> Result<(), ExchangeError> {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
        }
        self.mark_disconnected();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn codec(&self) -> &C {
        &self.codec
    }
}
