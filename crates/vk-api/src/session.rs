//! Signed session cookie validation
//!
//! VK sets a `vk_app_<app_id>` cookie of the form
//! `expire=..&mid=..&secret=..&sid=..&sig=..`, where `sig` signs the other four
//! fields with the application secret.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::sign::{sign, Params, SIG_KEY};

/// Fields a session cookie must carry, in the order they are checked
const COOKIE_FIELDS: [&str; 5] = ["expire", "mid", "secret", "sid", SIG_KEY];

/// Cookies are split into at most this many pieces
const MAX_COOKIE_PAIRS: usize = 10;

/// An authenticated VK user session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub secret: String,
    pub session_id: String,
}

/// Name of the session cookie for an app
pub fn cookie_name(app_id: &str) -> String {
    format!("vk_app_{}", app_id)
}

/// Verifies a raw session cookie value and extracts the session
///
/// `now` is the current Unix time; sessions expiring at or before it are
/// rejected. The signature is verified before any field is trusted.
pub fn parse_cookie_value(raw: Option<&str>, app_secret: &str, now: i64) -> Result<Session> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ApiError::NoCookie),
    };

    let pieces: Vec<&str> = raw.splitn(MAX_COOKIE_PAIRS, '&').collect();
    if !pieces.iter().any(|piece| piece.contains('=')) {
        return Err(ApiError::BadCookie);
    }

    let mut fields = Params::new();
    for piece in pieces {
        let Some((key, value)) = piece.split_once('=') else {
            continue;
        };
        if key.is_empty() || value.is_empty() || !COOKIE_FIELDS.contains(&key) {
            continue;
        }
        fields.insert(key.to_string(), value.to_string());
    }

    for field in COOKIE_FIELDS {
        if !fields.contains_key(field) {
            return Err(ApiError::MissingCookieField(field));
        }
    }

    let sig = fields.remove(SIG_KEY).ok_or(ApiError::MissingCookieField(SIG_KEY))?;
    if sign(&fields, app_secret) != sig {
        return Err(ApiError::BadSign);
    }

    // A non-numeric expiry can never be in the future
    let expire = fields
        .get("expire")
        .and_then(|e| e.trim().parse::<i64>().ok())
        .unwrap_or(0);
    if expire <= now {
        return Err(ApiError::SessionExpired);
    }

    let mut take = |key: &'static str| {
        fields
            .remove(key)
            .ok_or(ApiError::MissingCookieField(key))
    };

    Ok(Session {
        user_id: take("mid")?,
        secret: take("secret")?,
        session_id: take("sid")?,
    })
}

/// Finds a cookie in a `Cookie:` request header and percent-decodes its value
pub fn find_cookie(header: &str, name: &str) -> Result<Option<String>> {
    for entry in header.split(';') {
        let Some((key, value)) = entry.trim().split_once('=') else {
            continue;
        };
        if key.trim() == name {
            let decoded = urlencoding::decode(value.trim()).map_err(|_| ApiError::BadCookie)?;
            return Ok(Some(decoded.into_owned()));
        }
    }
    Ok(None)
}
