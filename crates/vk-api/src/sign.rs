//! Request and cookie signing
//!
//! VK authenticates signed requests and session cookies with an MD5 digest over
//! the sorted `key=value` pairs followed by the shared secret. The output must
//! match the server byte for byte.

use md5::{Digest, Md5};
use std::collections::BTreeMap;

/// Request parameters, kept sorted by key
pub type Params = BTreeMap<String, String>;

/// Name of the signature parameter
pub const SIG_KEY: &str = "sig";

/// Computes the signature of `params` with `secret`
///
/// `params` must not contain `sig` yet; the signature always covers the
/// pre-signature parameter set.
pub fn sign(params: &Params, secret: &str) -> String {
    debug_assert!(
        !params.contains_key(SIG_KEY),
        "signature must be computed before `sig` is added"
    );

    let mut payload = String::new();
    for (key, value) in params {
        payload.push_str(key);
        payload.push('=');
        payload.push_str(value);
    }
    payload.push_str(secret);

    md5_hex(&payload)
}

/// Computes the per-viewer auth key for an app
pub fn auth_key(app_id: &str, viewer_id: &str, secret: &str) -> String {
    md5_hex(&format!("{}_{}_{}", app_id, viewer_id, secret))
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}
