use crate::core::config::{ExchangeConfig, StreamConfig, DEFAULT_PUBLIC_URL};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{
    HmacSigner, ReqwestRest, RestClientBuilder, RestClientConfig, TungsteniteWs, WsConfig,
};
use crate::exchanges::coindcx::codec::SocketIoCodec;
use crate::exchanges::coindcx::stream::ConnectionSupervisor;
use std::sync::Arc;

pub const EXCHANGE_NAME: &str = "coindcx";

/// Supervisor over the production WebSocket transport.
pub type CoindcxStream = ConnectionSupervisor<TungsteniteWs<SocketIoCodec>>;

/// Create a signed REST client. Fails if the key or secret is empty.
pub fn build_rest_client(config: &ExchangeConfig) -> Result<ReqwestRest, ExchangeError> {
    let credentials = config.credentials()?;

    let rest_config = RestClientConfig::new(
        config.rest_base_url().to_string(),
        EXCHANGE_NAME.to_string(),
    )
    .with_timeout(30);

    RestClientBuilder::new(rest_config)
        .with_signer(Arc::new(HmacSigner::new(credentials)))
        .build()
}

/// Create an unsigned REST client for market data. Defaults to the public host.
pub fn build_public_rest_client(base_url: Option<String>) -> Result<ReqwestRest, ExchangeError> {
    let base_url = base_url.unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
    RestClientBuilder::new(RestClientConfig::new(base_url, EXCHANGE_NAME.to_string())).build()
}

/// Create a stream supervisor with default timings. Nothing connects until
/// `connect` is called on the result.
pub fn build_stream(config: &ExchangeConfig) -> Result<CoindcxStream, ExchangeError> {
    build_stream_with_config(config, StreamConfig::new(config.websocket_url()))
}

pub fn build_stream_with_config(
    config: &ExchangeConfig,
    stream_config: StreamConfig,
) -> Result<CoindcxStream, ExchangeError> {
    let credentials = config.credentials()?;

    let ws = TungsteniteWs::new(
        stream_config.url.clone(),
        EXCHANGE_NAME.to_string(),
        SocketIoCodec::new(),
    )
    .with_config(WsConfig {
        connect_timeout_ms: stream_config.handshake_timeout.as_millis() as u64,
    });

    Ok(ConnectionSupervisor::new(
        ws,
        Arc::new(HmacSigner::new(credentials)),
        stream_config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{DEFAULT_BASE_URL, DEFAULT_STREAM_URL};
    use crate::exchanges::coindcx::stream::ConnectionState;
    use std::time::Duration;

    #[test]
    fn test_missing_credentials_are_fatal() {
        let config = ExchangeConfig::new(String::new(), "secret".to_string());
        assert!(matches!(
            build_rest_client(&config),
            Err(ExchangeError::CredentialsMissing(_))
        ));
        assert!(matches!(
            build_stream(&config),
            Err(ExchangeError::CredentialsMissing(_))
        ));
    }

    #[test]
    fn test_rest_client_uses_configured_base() {
        let config = ExchangeConfig::new("key".to_string(), "secret".to_string());
        let rest = build_rest_client(&config).unwrap();
        assert_eq!(rest.config().base_url, DEFAULT_BASE_URL);
        assert_eq!(rest.config().exchange_name, EXCHANGE_NAME);

        let custom = config.base_url("http://localhost:9000".to_string());
        let rest = build_rest_client(&custom).unwrap();
        assert_eq!(rest.config().base_url, "http://localhost:9000");
    }

    #[test]
    fn test_public_client_defaults_to_public_host() {
        let rest = build_public_rest_client(None).unwrap();
        assert_eq!(rest.config().base_url, DEFAULT_PUBLIC_URL);
    }

    #[test]
    fn test_stream_starts_disconnected() {
        let config = ExchangeConfig::new("key".to_string(), "secret".to_string());
        let stream = build_stream(&config).unwrap();

        assert_eq!(stream.state(), ConnectionState::Disconnected);
        assert_eq!(stream.config().url, DEFAULT_STREAM_URL);
        assert_eq!(stream.config().keepalive_interval, Duration::from_secs(25));
    }

    #[test]
    fn test_stream_url_override_reaches_engine_io_endpoint() {
        let config = ExchangeConfig::new("key".to_string(), "secret".to_string())
            .stream_url("wss://stream.coindcx.com".to_string());
        let stream = build_stream(&config).unwrap();

        assert_eq!(stream.config().url, DEFAULT_STREAM_URL);
    }
}
