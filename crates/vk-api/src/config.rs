use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "vk-api";
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "VK_API_CONFIG";

/// VK endpoint hosts
///
/// Paths under these hosts are fixed; only the hosts are configurable so that
/// tests can point the client at a local server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Endpoints {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_oauth_base")]
    pub oauth_base: String,
}

fn default_api_base() -> String {
    "https://api.vk.com".to_string()
}

fn default_oauth_base() -> String {
    "https://oauth.vk.com".to_string()
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            oauth_base: default_oauth_base(),
        }
    }
}

impl Endpoints {
    /// Per-method endpoint used by token and unauthenticated calls
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/method/{}", self.api_base.trim_end_matches('/'), method)
    }

    /// Generic endpoint used by signed calls
    pub fn signed_url(&self) -> String {
        format!("{}/api.php", self.api_base.trim_end_matches('/'))
    }

    /// OAuth token endpoint
    pub fn token_url(&self) -> String {
        format!("{}/access_token", self.oauth_base.trim_end_matches('/'))
    }
}

/// Application credentials and API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub app_id: String,
    pub secret: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_use_https")]
    pub use_https: bool,
    /// Request timeout applied by the HTTP transport
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub endpoints: Endpoints,
}

fn default_api_version() -> String {
    "5.16".to_string()
}

fn default_language() -> String {
    "ru".to_string()
}

fn default_use_https() -> bool {
    true
}

fn default_timeout() -> u64 {
    10
}

impl ClientConfig {
    /// Creates a configuration with default version, language and endpoints
    pub fn new(app_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            secret: secret.into(),
            api_version: default_api_version(),
            language: default_language(),
            use_https: default_use_https(),
            timeout_secs: default_timeout(),
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_https(mut self, use_https: bool) -> Self {
        self.use_https = use_https;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Transport timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Value sent as the `https` request parameter
    pub fn https_flag(&self) -> &'static str {
        if self.use_https {
            "1"
        } else {
            "0"
        }
    }

    /// Loads and validates a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&data).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `VK_API_CONFIG` or the default location
    pub fn load_default() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::default_path()?,
        };
        tracing::debug!("Loading config from {}", path.display());
        Self::load(&path)
    }

    /// Returns the default config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join(APP_NAME)
            .join(CONFIG_FILE))
    }

    /// Rejects configurations that cannot produce valid requests
    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            anyhow::bail!("app_id must not be empty");
        }
        if self.secret.is_empty() {
            anyhow::bail!("secret must not be empty");
        }
        if self.api_version.trim().is_empty() {
            anyhow::bail!("api_version must not be empty");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

/// Runtime switches that may change after construction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClientOptions {
    /// Send `client_secret` alongside `access_token` in token-mode calls
    #[serde(default = "default_send_secret")]
    pub send_secret_in_token_calls: bool,
}

fn default_send_secret() -> bool {
    true
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            send_secret_in_token_calls: default_send_secret(),
        }
    }
}
