/// Transport kernel - venue-agnostic REST and WebSocket plumbing
///
/// # Architecture
///
/// ## Transport Layer
/// - `RestClient`: HTTP interface, one-shot calls, never retried
/// - `WsSession`: WebSocket connection, single owner, single writer
/// - `ReconnectBackoff`: exponential delay schedule for reconnects
///
/// ## Authentication
/// - `sign` / `canonical_json`: the signature engine
/// - `Signer`: pluggable authentication interface
/// - `HmacSigner`: HMAC-SHA256 over the canonical JSON body
///
/// ## Message Handling
/// - `WsCodec`: venue-specific frame encoding/decoding
///
/// # Example
///
/// ```rust,no_run
/// use coindcx_futures::core::config::Credentials;
/// use coindcx_futures::core::kernel::*;
/// use serde_json::{json, Map, Value};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = Credentials::new("api_key", "secret_key")?;
/// let rest_config = RestClientConfig::new(
///     "https://api.coindcx.com".to_string(),
///     "coindcx".to_string(),
/// );
/// let rest = RestClientBuilder::new(rest_config)
///     .with_signer(Arc::new(HmacSigner::new(credentials)))
///     .build()?;
///
/// let mut body = Map::new();
/// body.insert("id".to_string(), json!("order-id"));
/// let _: Value = rest
///     .post("/exchange/v1/derivatives/futures/orders/cancel", Some(body))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub mod backoff;
pub mod codec;
pub mod rest;
pub mod signer;
pub mod ws;

// Re-export key types for convenience
pub use backoff::ReconnectBackoff;
pub use codec::WsCodec;
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{canonical_json, sign, HmacSigner, SignedRequest, Signer};
pub use ws::{TungsteniteWs, WsConfig, WsSession};
