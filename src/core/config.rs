use crate::core::errors::ExchangeError;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.coindcx.com";
pub const DEFAULT_PUBLIC_URL: &str = "https://public.coindcx.com";
pub const DEFAULT_STREAM_URL: &str = "wss://stream.coindcx.com/socket.io/?EIO=4&transport=websocket";
const SOCKET_IO_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Expand a bare stream host to the Engine.IO upgrade endpoint. URLs that
/// already name a `/socket.io` path are kept as given.
pub fn socket_io_url(url: &str) -> String {
    if url.contains("/socket.io") {
        url.to_string()
    } else {
        format!("{}{}", url.trim_end_matches('/'), SOCKET_IO_PATH)
    }
}

/// API key and secret. Both must be non-empty; there is no read-only mode.
#[derive(Clone)]
pub struct Credentials {
    api_key: Secret<String>,
    secret_key: Secret<String>,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, ExchangeError> {
        let api_key = api_key.into();
        let secret_key = secret_key.into();

        if api_key.trim().is_empty() {
            return Err(ExchangeError::CredentialsMissing("api key is empty"));
        }
        if secret_key.trim().is_empty() {
            return Err(ExchangeError::CredentialsMissing("secret key is empty"));
        }

        Ok(Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
        })
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub base_url: Option<String>,
    pub stream_url: Option<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 4)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("stream_url", &self.stream_url)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            api_key: String,
            secret_key: String,
            #[serde(default)]
            base_url: Option<String>,
            #[serde(default)]
            stream_url: Option<String>,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            base_url: helper.base_url,
            stream_url: helper.stream_url,
        })
    }
}

impl ExchangeConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            base_url: None,
            stream_url: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_API_KEY` (e.g., `COINDCX_API_KEY`)
    /// - `{PREFIX}_API_SECRET` (e.g., `COINDCX_API_SECRET`)
    /// - `{PREFIX}_BASE_URL` (optional)
    /// - `{PREFIX}_WS_URL` (optional)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);
        let secret_key_var = format!("{}_API_SECRET", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        Ok(Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            base_url: env::var(format!("{}_BASE_URL", prefix)).ok(),
            stream_url: env::var(format!("{}_WS_URL", prefix)).ok(),
        })
    }

    /// Create configuration from a `.env` file (if present) and the process environment.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // no file, fall through to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Set custom REST base URL
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set custom stream URL
    #[must_use]
    pub fn stream_url(mut self, stream_url: String) -> Self {
        self.stream_url = Some(stream_url);
        self
    }

    pub fn rest_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn websocket_url(&self) -> String {
        socket_io_url(self.stream_url.as_deref().unwrap_or(DEFAULT_STREAM_URL))
    }

    /// Validate and extract the credentials. Fails on empty key or secret.
    pub fn credentials(&self) -> Result<Credentials, ExchangeError> {
        Credentials::new(
            self.api_key.expose_secret().as_str(),
            self.secret_key.expose_secret().as_str(),
        )
    }
}

/// Timing knobs for the realtime stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: String,
    /// Interval between application-level `ping` emits while connected.
    pub keepalive_interval: Duration,
    /// First reconnect delay; doubled per consecutive failure.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound for WebSocket upgrade plus namespace handshake.
    pub handshake_timeout: Duration,
    /// Command queue depth between handles and the stream actor.
    pub command_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            keepalive_interval: Duration::from_secs(25),
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(10),
            command_buffer: 256,
        }
    }
}

impl StreamConfig {
    /// `url` may be a bare host such as `wss://stream.coindcx.com`.
    pub fn new(url: impl AsRef<str>) -> Self {
        Self {
            url: socket_io_url(url.as_ref()),
            ..Self::default()
        }
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_credentials_rejected() {
        assert!(matches!(
            Credentials::new("", "secret"),
            Err(ExchangeError::CredentialsMissing(_))
        ));
        assert!(matches!(
            Credentials::new("key", "   "),
            Err(ExchangeError::CredentialsMissing(_))
        ));
        assert!(Credentials::new("key", "secret").is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("my-key", "my-secret").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("my-key"));
        assert!(!debug.contains("my-secret"));
    }

    #[test]
    fn test_bare_stream_host_gets_socket_io_path() {
        let config = ExchangeConfig::new("k".to_string(), "s".to_string())
            .stream_url("wss://stream.coindcx.com".to_string());
        assert_eq!(config.websocket_url(), DEFAULT_STREAM_URL);
        assert_eq!(
            StreamConfig::new("wss://stream.coindcx.com/").url,
            DEFAULT_STREAM_URL
        );
    }

    #[test]
    fn test_full_stream_url_kept() {
        let full = "wss://stream.example.com/socket.io/?EIO=4&transport=websocket&x=1";
        let config =
            ExchangeConfig::new("k".to_string(), "s".to_string()).stream_url(full.to_string());
        assert_eq!(config.websocket_url(), full);
        assert_eq!(StreamConfig::new(full).url, full);
    }

    #[test]
    fn test_serialize_redacts_secrets() {
        let config = ExchangeConfig::new("k".to_string(), "s3cr3t".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("s3cr3t"));
    }

    #[test]
    fn test_default_urls() {
        let config = ExchangeConfig::new("k".to_string(), "s".to_string());
        assert_eq!(config.rest_base_url(), DEFAULT_BASE_URL);
        assert!(config.websocket_url().starts_with("wss://"));

        let config = config.base_url("http://localhost:9000".to_string());
        assert_eq!(config.rest_base_url(), "http://localhost:9000");
    }

    #[test]
    fn test_stream_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.keepalive_interval, Duration::from_secs(25));
        assert_eq!(config.initial_backoff, Duration::from_secs(5));
        assert_eq!(config.max_backoff, Duration::from_secs(60));
    }
}
