//! OAuth token endpoint requests and responses

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::HttpResponse;
use crate::sign::Params;

const CLIENT_CREDENTIALS: &str = "client_credentials";

/// Parsed body of a successful token endpoint response
///
/// Fields VK adds for particular grants (for example `email` or per-group
/// tokens) that have no dedicated field are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    /// Lifetime in seconds; `0` means the token does not expire
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Form body for the client-credentials grant
pub(crate) fn client_credentials_params(config: &ClientConfig) -> Params {
    let mut params = Params::new();
    params.insert("client_id".to_string(), config.app_id.clone());
    params.insert("client_secret".to_string(), config.secret.clone());
    params.insert("v".to_string(), config.api_version.clone());
    params.insert("grant_type".to_string(), CLIENT_CREDENTIALS.to_string());
    params
}

/// Form body for exchanging an authorization code
pub(crate) fn authorization_code_params(
    config: &ClientConfig,
    code: &str,
    redirect_uri: &str,
) -> Params {
    let mut params = Params::new();
    params.insert("client_id".to_string(), config.app_id.clone());
    params.insert("client_secret".to_string(), config.secret.clone());
    params.insert("code".to_string(), code.to_string());
    params.insert("redirect_uri".to_string(), redirect_uri.to_string());
    params
}

/// Decodes a token endpoint response
///
/// OAuth failures come back as `{"error": "...", "error_description": "..."}`
/// rather than the method API's error object. Only `access_token` is required;
/// the other known fields are read when they hold a usable value and left in
/// `extra` otherwise.
pub(crate) fn parse_token_response(response: &HttpResponse) -> Result<TokenResponse> {
    if response.body.trim().is_empty() {
        return Err(ApiError::Parse);
    }

    let value = response.json_value().map_err(|_| ApiError::Parse)?;

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let description = value
            .get("error_description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(ApiError::OAuth {
            error: error.to_string(),
            description: description.to_string(),
        });
    }

    let Value::Object(mut fields) = value else {
        return Err(ApiError::MissingToken);
    };

    let access_token = match fields.remove("access_token") {
        Some(Value::String(token)) if !token.is_empty() => token,
        _ => return Err(ApiError::MissingToken),
    };

    let expires_in = take_field(&mut fields, "expires_in", lenient_i64);
    let user_id = take_field(&mut fields, "user_id", lenient_i64);
    let email = take_field(&mut fields, "email", |v| v.as_str().map(str::to_string));

    Ok(TokenResponse {
        access_token,
        expires_in,
        user_id,
        email,
        extra: fields,
    })
}

/// Removes `key` from `fields` if `convert` accepts its value
fn take_field<T>(
    fields: &mut Map<String, Value>,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let converted = fields.get(key).and_then(convert)?;
    fields.remove(key);
    Some(converted)
}

/// Reads an integer VK may send as a number, a float or a numeric string
fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn client_credentials_params_are_complete() {
        let config = ClientConfig::new("123", "secret").with_api_version("5.131");
        let params = client_credentials_params(&config);

        assert_eq!(params.len(), 4);
        assert_eq!(params["client_id"], "123");
        assert_eq!(params["client_secret"], "secret");
        assert_eq!(params["v"], "5.131");
        assert_eq!(params["grant_type"], "client_credentials");
    }

    #[test]
    fn authorization_code_params_are_complete() {
        let config = ClientConfig::new("123", "secret");
        let params = authorization_code_params(&config, "abc", "https://example.com/cb");

        assert_eq!(params.len(), 4);
        assert_eq!(params["code"], "abc");
        assert_eq!(params["redirect_uri"], "https://example.com/cb");
        assert!(!params.contains_key("grant_type"));
    }

    #[test]
    fn parses_full_token_response() {
        let token = parse_token_response(&response(
            r#"{"access_token": "tok", "expires_in": 86400, "user_id": 66748, "email": "a@b.c", "state": "xyz"}"#,
        ))
        .unwrap();

        assert_eq!(token.access_token, "tok");
        assert_eq!(token.expires_in, Some(86400));
        assert_eq!(token.user_id, Some(66748));
        assert_eq!(token.email.as_deref(), Some("a@b.c"));
        assert_eq!(token.extra["state"], "xyz");
    }

    #[test]
    fn parses_minimal_token_response() {
        let token = parse_token_response(&response(r#"{"access_token": "tok"}"#)).unwrap();

        assert_eq!(token.access_token, "tok");
        assert_eq!(token.user_id, None);
        assert!(token.extra.is_empty());
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = parse_token_response(&response(r#"{"expires_in": 0}"#)).unwrap_err();
        assert!(matches!(err, ApiError::MissingToken));
    }

    #[test]
    fn empty_token_is_an_error() {
        let err = parse_token_response(&response(r#"{"access_token": ""}"#)).unwrap_err();
        assert!(matches!(err, ApiError::MissingToken));
    }

    #[test]
    fn oauth_error_is_decoded() {
        let err = parse_token_response(&response(
            r#"{"error": "invalid_client", "error_description": "client_secret is incorrect"}"#,
        ))
        .unwrap_err();

        match err {
            ApiError::OAuth { error, description } => {
                assert_eq!(error, "invalid_client");
                assert_eq!(description, "client_secret is incorrect");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn null_token_is_missing() {
        let err = parse_token_response(&response(r#"{"access_token": null}"#)).unwrap_err();
        assert!(matches!(err, ApiError::MissingToken));
    }

    #[test]
    fn non_string_token_is_missing() {
        let err = parse_token_response(&response(r#"{"access_token": 123}"#)).unwrap_err();
        assert!(matches!(err, ApiError::MissingToken));
    }

    #[test]
    fn non_object_body_has_no_token() {
        let err = parse_token_response(&response("[1, 2]")).unwrap_err();
        assert!(matches!(err, ApiError::MissingToken));
    }

    #[test]
    fn string_user_id_is_accepted() {
        let token =
            parse_token_response(&response(r#"{"access_token": "tok", "user_id": "66748"}"#))
                .unwrap();

        assert_eq!(token.access_token, "tok");
        assert_eq!(token.user_id, Some(66748));
        assert!(token.extra.is_empty());
    }

    #[test]
    fn float_expires_in_is_accepted() {
        let token =
            parse_token_response(&response(r#"{"access_token": "tok", "expires_in": 86400.0}"#))
                .unwrap();

        assert_eq!(token.expires_in, Some(86400));
    }

    #[test]
    fn unusable_sibling_fields_stay_in_extra() {
        let token = parse_token_response(&response(
            r#"{"access_token": "tok", "user_id": {"id": 1}, "email": null}"#,
        ))
        .unwrap();

        assert_eq!(token.access_token, "tok");
        assert_eq!(token.user_id, None);
        assert_eq!(token.email, None);
        assert_eq!(token.extra["user_id"]["id"], 1);
        assert!(token.extra["email"].is_null());
    }

    #[test]
    fn non_json_body_is_parse_error() {
        assert!(matches!(
            parse_token_response(&response("oops")).unwrap_err(),
            ApiError::Parse
        ));
        assert!(matches!(
            parse_token_response(&response("  ")).unwrap_err(),
            ApiError::Parse
        ));
    }
}
