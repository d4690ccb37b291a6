//! Error type shared by every VK client operation.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the VK client.
///
/// The `Display` output is the human-readable message; `code()` carries the
/// provider's numeric error code where one exists.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (network, timeout, TLS).
    #[error("{0:#}")]
    Transport(anyhow::Error),

    /// The body was empty or not JSON.
    #[error("response parse error")]
    Parse,

    /// VK answered with an `error` object.
    #[error("{message}")]
    Provider { code: i64, message: String },

    /// The body was JSON but carried neither `response` nor `error`.
    #[error("VK API error")]
    Envelope,

    /// The OAuth endpoint rejected the request.
    #[error("{error}: {description}")]
    OAuth { error: String, description: String },

    /// The OAuth endpoint answered without an `access_token`.
    #[error("No access token in response")]
    MissingToken,

    #[error("No cookie")]
    NoCookie,

    #[error("Bad cookie")]
    BadCookie,

    #[error("No {0} parameter")]
    MissingCookieField(&'static str),

    #[error("Bad sign")]
    BadSign,

    #[error("Session expired")]
    SessionExpired,
}

impl ApiError {
    /// Returns the provider error code, if VK supplied one
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Provider { code, .. } => Some(*code),
            _ => None,
        }
    }
}
