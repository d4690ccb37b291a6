//! Common test utilities for integration tests

use vk_api::sign::sign;
use vk_api::{ClientConfig, Endpoints, Params, VkClient};

pub const APP_ID: &str = "4242";
pub const SECRET: &str = "integration_secret";

/// Creates a client whose endpoints all point at `base`
pub fn client_for(base: &str) -> VkClient {
    let config = ClientConfig::new(APP_ID, SECRET).with_endpoints(Endpoints {
        api_base: base.to_string(),
        oauth_base: base.to_string(),
    });
    VkClient::new(config)
}

/// Decodes a URL-encoded form body
pub fn decode_form(body: &[u8]) -> Params {
    url::form_urlencoded::parse(body).into_owned().collect()
}

/// Builds a session cookie signed with the test app secret
pub fn signed_cookie(expire: i64, mid: &str, secret: &str, sid: &str) -> String {
    let mut fields = Params::new();
    fields.insert("expire".to_string(), expire.to_string());
    fields.insert("mid".to_string(), mid.to_string());
    fields.insert("secret".to_string(), secret.to_string());
    fields.insert("sid".to_string(), sid.to_string());
    let sig = sign(&fields, SECRET);

    format!(
        "expire={}&mid={}&secret={}&sid={}&sig={}",
        expire, mid, secret, sid, sig
    )
}
