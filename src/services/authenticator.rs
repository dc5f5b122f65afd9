use crate::config::ServerConfig;
use crate::utils::auth::{Claims, validate_jwt};
use axum::http::{HeaderMap, Uri, header};
use axum::http::HeaderValue;
use subtle::ConstantTimeEq;

pub const API_KEY_HEADER: &str = "x-api-key";
const API_KEY_PARAM: &str = "api_key";

/// Who got through the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    ApiKey,
    Token(Claims),
    /// Gate disabled with `auth_required = false`.
    Anonymous,
}

impl Principal {
    /// Short label for logs; never includes the credential itself.
    pub fn describe(&self) -> String {
        match self {
            Principal::ApiKey => "api-key".to_string(),
            Principal::Token(claims) => {
                format!("token:{}", claims.subject().as_deref().unwrap_or("-"))
            }
            Principal::Anonymous => "anonymous".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthResult {
    Accepted(Principal),
    RejectedUnauthenticated,
    RejectedInvalid,
}

/// Pull the caller's credential out of the request.
///
/// Looks at the `x-api-key` header, then the `api_key` query parameter, then
/// `Authorization: Bearer <token>`. The first non-empty value wins; when the
/// query repeats `api_key`, the first non-empty occurrence is used.
pub fn extract_credential(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(API_KEY_HEADER)
        .and_then(header_text)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    from_header
        .or_else(|| query_api_key(uri.query().unwrap_or_default()))
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(header_text)
                .and_then(strip_bearer)
                .map(str::to_string)
        })
}

/// Header values are bytes; accept any valid UTF-8, not just visible ASCII.
fn header_text(value: &HeaderValue) -> Option<&str> {
    std::str::from_utf8(value.as_bytes()).ok()
}

fn query_api_key(query: &str) -> Option<String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .ok()?
        .into_iter()
        .find(|(name, value)| name == API_KEY_PARAM && !value.is_empty())
        .map(|(_, value)| value)
}

fn strip_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    let (scheme, rest) = value.split_at_checked(6)?;
    if !scheme.eq_ignore_ascii_case("bearer") || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim()).filter(|t| !t.is_empty())
}

/// Apply the credential policy.
///
/// An exact API key match wins. Otherwise, when a signing secret is
/// configured, any presented credential must verify as a token or the caller
/// is rejected as invalid. Everything else is unauthenticated.
pub fn authenticate(
    credential: Option<&str>,
    api_key: Option<&str>,
    signing_secret: Option<&str>,
) -> AuthResult {
    if let (Some(expected), Some(presented)) = (api_key, credential) {
        if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
            return AuthResult::Accepted(Principal::ApiKey);
        }
    }

    match (signing_secret, credential) {
        (Some(secret), Some(token)) => match validate_jwt(token, secret) {
            Ok(claims) => AuthResult::Accepted(Principal::Token(claims)),
            Err(e) => {
                tracing::debug!("Token verification failed: {}", e);
                AuthResult::RejectedInvalid
            }
        },
        _ => AuthResult::RejectedUnauthenticated,
    }
}

/// Gate a request against the configured policy.
pub fn authorize(config: &ServerConfig, headers: &HeaderMap, uri: &Uri) -> AuthResult {
    if !config.auth_required {
        return AuthResult::Accepted(Principal::Anonymous);
    }

    let credential = extract_credential(headers, uri);
    authenticate(
        credential.as_deref(),
        config.api_key.as_deref(),
        config.jwt_secret.as_deref(),
    )
}
