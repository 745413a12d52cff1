use crate::core::config::Credentials;
use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use serde_json::{json, Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "X-AUTH-APIKEY";
pub const SIGNATURE_HEADER: &str = "X-AUTH-SIGNATURE";

/// Compute the hex-encoded HMAC-SHA256 of `payload` keyed by `secret`.
///
/// Pure and deterministic: the same secret and the same payload bytes always
/// produce the same digest.
pub fn sign(secret: &str, payload: &[u8]) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Serialize a JSON value compactly with object keys in sorted order.
///
/// These are the exact bytes that get signed and put on the wire; the
/// signature is only valid for this byte sequence.
pub fn canonical_json(value: &Value) -> Result<Vec<u8>, ExchangeError> {
    Ok(serde_json::to_vec(&sorted(value))?)
}

// Rebuilds objects with keys inserted in sorted order so the output is stable
// whether or not serde_json keeps insertion order.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k.clone(), sorted(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// A fully prepared authenticated request. Built fresh for every call.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: String,
    pub endpoint: String,
    /// Canonical body bytes, `timestamp` included. Send these verbatim.
    pub body: Vec<u8>,
    pub timestamp: u64,
    pub signature: String,
    pub headers: Vec<(String, String)>,
}

/// Signer trait for request authentication
///
/// Implementations own the credentials and know how the venue expects a
/// request to be authenticated.
pub trait Signer: Send + Sync {
    /// Sign a request body
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `endpoint` - API endpoint path
    /// * `body` - Request body mapping; `None` signs an empty object
    /// * `timestamp` - Request timestamp in milliseconds, injected into the body
    fn sign_request(
        &self,
        method: &str,
        endpoint: &str,
        body: Option<Map<String, Value>>,
        timestamp: u64,
    ) -> Result<SignedRequest, ExchangeError>;

    /// Signature attached to the join of an authenticated stream channel.
    fn sign_channel(&self, channel: &str) -> Result<String, ExchangeError>;

    fn api_key(&self) -> &str;
}

/// HMAC-SHA256 body signer used by CoinDCX
#[derive(Debug, Clone)]
pub struct HmacSigner {
    credentials: Credentials,
}

impl HmacSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl Signer for HmacSigner {
    fn sign_request(
        &self,
        method: &str,
        endpoint: &str,
        body: Option<Map<String, Value>>,
        timestamp: u64,
    ) -> Result<SignedRequest, ExchangeError> {
        let mut body = body.unwrap_or_default();
        body.insert("timestamp".to_string(), Value::from(timestamp));

        let payload = canonical_json(&Value::Object(body))?;
        let signature = sign(self.credentials.secret_key(), &payload)?;

        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            (
                API_KEY_HEADER.to_string(),
                self.credentials.api_key().to_string(),
            ),
            (SIGNATURE_HEADER.to_string(), signature.clone()),
        ];

        Ok(SignedRequest {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            body: payload,
            timestamp,
            signature,
            headers,
        })
    }

    fn sign_channel(&self, channel: &str) -> Result<String, ExchangeError> {
        let payload = canonical_json(&json!({ "channel": channel }))?;
        sign(self.credentials.secret_key(), &payload)
    }

    fn api_key(&self) -> &str {
        self.credentials.api_key()
    }
}
