use crate::core::errors::ExchangeError;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for the venue's WebSocket framing
///
/// Converts between raw WebSocket messages and typed frames. The transport
/// only moves `Message`s; everything protocol-specific lives behind this trait.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing parsed inbound frames
    type Message: Send + Sync;

    /// Encode a named outbound event (join, leave, ping, ...) with its payload
    ///
    /// # Returns
    /// A WebSocket message ready to be sent to the exchange
    fn encode_event(&self, event: &str, payload: &Value) -> Result<Message, ExchangeError>;

    /// Decode a raw WebSocket message into a typed frame
    ///
    /// # Returns
    /// - `Ok(Some(frame))` - Successfully decoded frame
    /// - `Ok(None)` - Message was ignored by the codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError>;
}
