use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{SignedRequest, Signer};
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{instrument, trace, warn};

/// REST client trait for making HTTP requests
///
/// Implementations never retry: a failed call is reported once to the caller,
/// who decides whether resubmitting is safe.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make an unauthenticated GET request
    ///
    /// # Arguments
    /// * `endpoint` - API path, or an absolute `http(s)://` URL
    /// * `query_params` - Query parameters as key-value pairs
    async fn get(&self, endpoint: &str, query_params: &[(&str, &str)])
        -> Result<Value, ExchangeError>;

    /// Make an unauthenticated GET request with strongly-typed response
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, ExchangeError>;

    /// Make a signed POST request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `body` - Optional body mapping; `timestamp` is injected before signing
    async fn post(
        &self,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<Value, ExchangeError>;

    /// Make a signed POST request with strongly-typed response
    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<T, ExchangeError>;

    /// Make a signed request with custom method
    async fn signed_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<Value, ExchangeError>;

    /// Make a signed request with custom method and strongly-typed response
    async fn signed_request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<T, ExchangeError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout_seconds: 30,
            user_agent: concat!("coindcx-futures/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
        })
    }
}

/// Implementation of `RestClient` using reqwest
///
/// Cloning is cheap and shares the connection pool. The only state is the
/// immutable signer, so one instance can serve any number of concurrent callers.
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// Current time in epoch milliseconds
    fn get_timestamp() -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
    }

    /// Build the full URL for an endpoint
    fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
        }
    }

    /// Sign a request without sending it.
    pub fn prepare(
        &self,
        method: &Method,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<SignedRequest, ExchangeError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::AuthError("Authentication required but no signer provided".to_string())
        })?;
        signer.sign_request(method.as_str(), endpoint, body, Self::get_timestamp())
    }

    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await?;

        trace!("Response body: {}", response_text);

        if !status.is_success() {
            warn!(status = status.as_u16(), "request rejected");
            return Err(ExchangeError::RequestError {
                status: status.as_u16(),
                body: response_text,
            });
        }

        if response_text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&response_text)?)
    }

    #[instrument(skip(self, query_params), fields(exchange = %self.config.exchange_name, endpoint = %endpoint))]
    async fn send_public(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Value, ExchangeError> {
        let mut request = self.client.get(self.build_url(endpoint));
        if !query_params.is_empty() {
            request = request.query(query_params);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Send a prepared request. The signed bytes go out unchanged.
    #[instrument(skip(self, signed), fields(exchange = %self.config.exchange_name, method = %signed.method, endpoint = %signed.endpoint))]
    pub async fn execute(&self, signed: SignedRequest) -> Result<Value, ExchangeError> {
        let method = Method::from_bytes(signed.method.as_bytes()).map_err(|e| {
            ExchangeError::InvalidParameters(format!("Invalid HTTP method: {}", e))
        })?;
        let mut request = self
            .client
            .request(method, self.build_url(&signed.endpoint));

        for (key, value) in &signed.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.body(signed.body).send().await?;
        self.handle_response(response).await
    }

    async fn send_signed(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<Value, ExchangeError> {
        let signed = self.prepare(&method, endpoint, body)?;
        self.execute(signed).await
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ExchangeError> {
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Value, ExchangeError> {
        self.send_public(endpoint, query_params).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, ExchangeError> {
        self.send_public(endpoint, query_params)
            .await
            .and_then(decode)
    }

    async fn post(
        &self,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<Value, ExchangeError> {
        self.send_signed(Method::POST, endpoint, body).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<T, ExchangeError> {
        self.send_signed(Method::POST, endpoint, body)
            .await
            .and_then(decode)
    }

    async fn signed_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<Value, ExchangeError> {
        self.send_signed(method, endpoint, body).await
    }

    async fn signed_request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<T, ExchangeError> {
        self.send_signed(method, endpoint, body)
            .await
            .and_then(decode)
    }
}
