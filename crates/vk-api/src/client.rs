use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{ClientConfig, ClientOptions};
use crate::error::{ApiError, Result};
use crate::http::{HttpClient, HttpResponse, ReqwestClient};
use crate::oauth::{self, TokenResponse};
use crate::session::{self, Session};
use crate::sign::{self, Params, SIG_KEY};
use crate::time::{Clock, SystemClock};

/// How a method call is authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Signed with the app secret and sent to the generic `api.php` endpoint
    #[default]
    Signed,
    /// Authenticated with the server access token, fetched on first use
    Token,
    /// Sent without credentials
    Public,
}

impl AuthMode {
    /// Maps the `(auth_by_token, require_auth)` flag pair to a mode
    ///
    /// `require_auth = false` wins over `auth_by_token`.
    pub fn from_flags(auth_by_token: bool, require_auth: bool) -> Self {
        match (auth_by_token, require_auth) {
            (_, false) => AuthMode::Public,
            (true, true) => AuthMode::Token,
            (false, true) => AuthMode::Signed,
        }
    }
}

/// VK API client
///
/// Generic over the HTTP client implementation for testability. Clones share
/// the cached access token.
pub struct VkClient<H: HttpClient = ReqwestClient> {
    http: H,
    config: Arc<ClientConfig>,
    options: ClientOptions,
    clock: Arc<dyn Clock>,
    access_token: Arc<Mutex<Option<String>>>,
}

impl VkClient<ReqwestClient> {
    /// Creates a new VK API client with the default HTTP implementation
    pub fn new(config: ClientConfig) -> Self {
        let http = ReqwestClient::with_timeout(config.timeout());
        Self::with_http_client(config, http)
    }
}

impl<H: HttpClient> VkClient<H> {
    /// Creates a new VK API client with a custom HTTP implementation
    pub fn with_http_client(config: ClientConfig, http: H) -> Self {
        Self {
            http,
            config: Arc::new(config),
            options: ClientOptions::default(),
            clock: Arc::new(SystemClock),
            access_token: Arc::new(Mutex::new(None)),
        }
    }

    /// Replaces the clock used for request timestamps and cookie expiry
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets runtime options
    pub fn set_options(&mut self, options: ClientOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ClientOptions {
        self.options
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn app_id(&self) -> &str {
        &self.config.app_id
    }

    pub fn api_version(&self) -> &str {
        &self.config.api_version
    }

    /// Computes the auth key VK passes to iframe apps for `viewer_id`
    pub fn calculate_auth_key(&self, viewer_id: &str) -> String {
        sign::auth_key(&self.config.app_id, viewer_id, &self.config.secret)
    }
}

// Access token methods
impl<H: HttpClient> VkClient<H> {
    /// Overwrites the cached access token
    pub async fn set_access_token(&self, token: impl Into<String>) -> &Self {
        *self.access_token.lock().await = Some(token.into());
        self
    }

    /// Gets the cached access token
    pub async fn access_token(&self) -> Option<String> {
        self.access_token.lock().await.clone()
    }

    /// Drops the cached access token so the next token call fetches a new one
    pub async fn clear_access_token(&self) {
        *self.access_token.lock().await = None;
    }

    /// Obtains a server access token via the client-credentials grant
    ///
    /// The token is returned but not cached; token-mode calls cache the
    /// token they fetch.
    pub async fn get_server_access_token(&self) -> Result<String> {
        tracing::info!("Requesting server access token for app {}", self.config.app_id);

        let params = oauth::client_credentials_params(&self.config);
        let response = self.post(&self.config.endpoints.token_url(), &params).await?;

        Ok(oauth::parse_token_response(&response)?.access_token)
    }

    /// Exchanges an authorization code for a user token
    pub async fn get_access_token(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        tracing::info!("Exchanging authorization code for app {}", self.config.app_id);

        let params = oauth::authorization_code_params(&self.config, code, redirect_uri);
        let response = self.post(&self.config.endpoints.token_url(), &params).await?;

        oauth::parse_token_response(&response)
    }

    /// Returns the cached token, fetching it first if there is none
    ///
    /// The lock is held across the fetch so concurrent callers share one
    /// token request.
    async fn cached_or_fetch_token(&self) -> Result<String> {
        let mut guard = self.access_token.lock().await;

        if let Some(token) = guard.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }

        let token = self.get_server_access_token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }
}

// Method calls
impl<H: HttpClient> VkClient<H> {
    /// Calls an API method and returns the `response` payload
    pub async fn call(&self, method: &str, mut params: Params, auth: AuthMode) -> Result<Value> {
        params.insert("v".to_string(), self.config.api_version.clone());
        params.insert("lang".to_string(), self.config.language.clone());
        params.insert("https".to_string(), self.config.https_flag().to_string());

        let url = match auth {
            AuthMode::Public => self.config.endpoints.method_url(method),
            AuthMode::Token => {
                let token = self.cached_or_fetch_token().await?;
                if self.options.send_secret_in_token_calls {
                    params.insert("client_secret".to_string(), self.config.secret.clone());
                }
                params.insert("access_token".to_string(), token);
                self.config.endpoints.method_url(method)
            }
            AuthMode::Signed => {
                params.insert("api_id".to_string(), self.config.app_id.clone());
                params.insert("method".to_string(), method.to_string());
                params.insert("format".to_string(), "json".to_string());
                params.insert(
                    "random".to_string(),
                    rand::rng().random_range(1..=9999).to_string(),
                );
                params.insert(
                    "timestamp".to_string(),
                    self.clock.unix_timestamp().to_string(),
                );
                params.remove(SIG_KEY);
                let sig = sign::sign(&params, &self.config.secret);
                params.insert(SIG_KEY.to_string(), sig);
                self.config.endpoints.signed_url()
            }
        };

        tracing::debug!("Calling {} ({:?})", method, auth);

        let response = self.post(&url, &params).await?;
        unwrap_envelope(&response).inspect_err(|e| {
            if let Some(code) = e.code() {
                tracing::warn!("VK method {} failed with code {}: {}", method, code, e);
            }
        })
    }

    /// Calls an API method using the `(auth_by_token, require_auth)` flags
    pub async fn call_with_flags(
        &self,
        method: &str,
        params: Params,
        auth_by_token: bool,
        require_auth: bool,
    ) -> Result<Value> {
        self.call(method, params, AuthMode::from_flags(auth_by_token, require_auth))
            .await
    }

    async fn post(&self, url: &str, params: &Params) -> Result<HttpResponse> {
        let response = self
            .http
            .post_form(url, params)
            .await
            .map_err(ApiError::Transport)?;

        // VK reports failures in the body; the status only helps diagnose proxies
        if !response.is_success() {
            tracing::debug!("{} answered with HTTP {}", url, response.status);
        }

        Ok(response)
    }
}

// Session cookie methods
impl<H: HttpClient> VkClient<H> {
    /// Name of this app's session cookie
    pub fn cookie_name(&self) -> String {
        session::cookie_name(&self.config.app_id)
    }

    /// Validates a raw `vk_app_<app_id>` cookie value
    pub fn parse_cookie(&self, raw: Option<&str>) -> Result<Session> {
        session::parse_cookie_value(raw, &self.config.secret, self.clock.unix_timestamp())
    }

    /// Finds and validates this app's session cookie in a `Cookie:` header
    pub fn session_from_cookie_header(&self, header: &str) -> Result<Session> {
        let value = session::find_cookie(header, &self.cookie_name())?;
        self.parse_cookie(value.as_deref())
    }
}

impl<H: HttpClient + Clone> Clone for VkClient<H> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            options: self.options,
            clock: self.clock.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

/// Extracts the `response` payload from a VK envelope
fn unwrap_envelope(response: &HttpResponse) -> Result<Value> {
    if response.body.trim().is_empty() {
        return Err(ApiError::Parse);
    }

    let mut envelope = response.json_value().map_err(|_| ApiError::Parse)?;

    if let Some(error) = envelope.get("error") {
        let code = error.get("error_code").and_then(|c| {
            c.as_i64()
                .or_else(|| c.as_str().and_then(|s| s.trim().parse().ok()))
        });
        let message = error.get("error_msg").and_then(Value::as_str);
        if let (Some(code), Some(message)) = (code, message) {
            return Err(ApiError::Provider {
                code,
                message: message.to_string(),
            });
        }
    }

    match envelope.get_mut("response") {
        Some(payload) => Ok(payload.take()),
        None => Err(ApiError::Envelope),
    }
}
