//! Configuration Management
//!
//! `ProviderConfig` is the typed connection configuration shared read-only
//! by every handler. `Settings` is the CLI's on-disk file holding the
//! provider block.

use crate::error::ProviderError;
use crate::ipa::IpaClient;
use crate::state::ResourceData;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use url::Url;

pub const ENV_HOST: &str = "FREEIPA_HOST";
pub const ENV_USERNAME: &str = "FREEIPA_USERNAME";
pub const ENV_PASSWORD: &str = "FREEIPA_PASSWORD";

/// Connection parameters for one provider run
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    /// Skip TLS certificate verification
    pub insecure_skip_verify: bool,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

impl ProviderConfig {
    /// Build from provider-level state. Absent values fall back to
    /// `FREEIPA_HOST`, `FREEIPA_USERNAME` and `FREEIPA_PASSWORD`, then to
    /// empty strings; never fails.
    pub fn from_data(data: &ResourceData) -> Self {
        let string = |key: &str, env: &str| {
            data.get_str(key)
                .map(str::to_string)
                .or_else(|| std::env::var(env).ok())
                .unwrap_or_default()
        };

        Self {
            host: string("host", ENV_HOST),
            username: string("username", ENV_USERNAME),
            password: string("password", ENV_PASSWORD),
            insecure_skip_verify: data.get_bool("insecure").unwrap_or(false),
        }
    }

    /// Base URL of the server. A bare host name implies HTTPS.
    pub fn base_url(&self) -> Result<Url> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(anyhow::anyhow!("host is not set (configure it or set {})", ENV_HOST));
        }
        let raw = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        let mut url = Url::parse(&raw).with_context(|| format!("Invalid host {:?}", host))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Build an authenticated client; any failure is a configuration error
    pub async fn client(&self) -> Result<IpaClient, ProviderError> {
        let url = self.base_url().map_err(ProviderError::Configuration)?;
        IpaClient::connect(url, &self.username, &self.password, self.insecure_skip_verify)
            .await
            .map_err(ProviderError::Configuration)
    }
}

/// CLI settings file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Provider block passed to `configure`
    #[serde(default)]
    pub provider: Option<Value>,
}

impl Settings {
    /// Get the default settings file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("freeipa-provider").join("config.yaml"))
    }

    /// Load settings from `path`, or from the default location.
    /// A missing default file yields empty settings; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Provider block as JSON, `{}` when unset
    pub fn provider_block(&self) -> Value {
        self.provider
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}
