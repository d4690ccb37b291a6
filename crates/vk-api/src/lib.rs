//! Client for the VK API
//!
//! Signs requests with the application secret, obtains OAuth tokens,
//! validates `vk_app_<app_id>` session cookies and unwraps the JSON envelope
//! of every response into a payload or an [`ApiError`].

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod session;
pub mod sign;
pub mod time;

pub use client::{AuthMode, VkClient};
pub use config::{ClientConfig, ClientOptions, Endpoints};
pub use error::{ApiError, Result};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use oauth::TokenResponse;
pub use session::Session;
pub use sign::Params;
