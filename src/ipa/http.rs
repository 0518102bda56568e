//! HTTP transport for the FreeIPA JSON-RPC API
//!
//! Logs in once with username/password; the `ipa_session` cookie kept by
//! the cookie store authenticates every later call.

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, REFERER};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

/// API version sent with every call
pub const API_VERSION: &str = "2.251";

/// FreeIPA error code for a missing entry
pub const NOT_FOUND: i64 = 4001;

/// FreeIPA error code for a modification with no changes
pub const EMPTY_MODLIST: i64 = 4202;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Error object of a JSON-RPC answer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub name: String,
    pub message: String,
}

impl RpcError {
    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND
    }
}

/// True when the error chain carries a FreeIPA "not found" answer
pub fn is_not_found(error: &anyhow::Error) -> bool {
    rpc_error_code(error) == Some(NOT_FOUND)
}

pub fn rpc_error_code(error: &anyhow::Error) -> Option<i64> {
    error.downcast_ref::<RpcError>().map(|e| e.code)
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// HTTP client wrapper for FreeIPA API calls
#[derive(Clone)]
pub struct IpaHttpClient {
    client: Client,
    base_url: Url,
}

impl IpaHttpClient {
    /// Create a new HTTP client for the server at `base_url`
    pub fn new(base_url: Url, insecure: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("freeipa-provider/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .danger_accept_invalid_certs(insecure)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid FreeIPA URL {}{}", self.base_url, path))
    }

    fn referer(&self) -> String {
        format!("{}/ipa", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Authenticate with username and password
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let url = self.endpoint("ipa/session/login_password")?;
        tracing::debug!("POST {} (user {})", url, username);

        let response = self
            .client
            .post(url)
            .header(REFERER, self.referer())
            .header(ACCEPT, "text/plain")
            .form(&[("user", username), ("password", password)])
            .send()
            .await
            .context("Failed to send login request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Login failed: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("login as {} failed: {}", username, status));
        }

        Ok(())
    }

    /// Invoke a JSON-RPC method and return its `result` object
    pub async fn call(
        &self,
        method: &str,
        args: Vec<Value>,
        options: Map<String, Value>,
    ) -> Result<Value> {
        let url = self.endpoint("ipa/session/json")?;
        tracing::debug!("RPC {}", method);

        let mut options = options;
        options
            .entry("version")
            .or_insert_with(|| Value::String(API_VERSION.to_string()));

        let request = json!({
            "method": method,
            "params": [args, options],
            "id": 0,
        });

        let response = self
            .client
            .post(url)
            .header(REFERER, self.referer())
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("API request {} failed: {}", method, status));
        }

        let envelope: RpcEnvelope =
            serde_json::from_str(&body).context("Failed to parse response JSON")?;

        if let Some(error) = envelope.error {
            tracing::debug!("RPC {} returned error {} ({})", method, error.code, error.name);
            return Err(error.into());
        }

        envelope
            .result
            .ok_or_else(|| anyhow::anyhow!("RPC {} returned neither result nor error", method))
    }
}
