use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Claims carried by a signed bearer token.
///
/// Issuers are free to put any JSON in `sub` and `exp`, so both stay untyped;
/// the signature check and `exp`/`nbf` enforcement happen in [`validate_jwt`].
/// Everything else is kept in `extra` for logging.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// `sub` rendered for logs: strings as-is, other JSON values serialized.
    pub fn subject(&self) -> Option<String> {
        self.sub.as_ref().map(|sub| match sub {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Token lifetime from a count of hours; rejects non-positive and
/// out-of-range values instead of panicking.
pub fn lifetime_hours(hours: i64) -> Result<Duration> {
    if hours <= 0 {
        anyhow::bail!("token lifetime must be positive, got {} hours", hours);
    }
    Duration::try_hours(hours)
        .ok_or_else(|| anyhow::anyhow!("token lifetime of {} hours is out of range", hours))
}

pub fn create_jwt(subject: &str, secret: &str, ttl: Duration) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("token lifetime overflows the calendar"))?
        .timestamp();

    let claims = Claims {
        sub: Some(serde_json::Value::String(subject.to_owned())),
        exp: Some(serde_json::Value::from(expiration.max(0))),
        extra: serde_json::Map::new(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

/// Verify an HMAC-signed token.
///
/// `exp` and `nbf` are enforced when present, with no clock leeway, but not
/// required. `aud` is not checked: no audience is configured for this server.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.required_spec_claims = HashSet::new();
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jwt_cycle() {
        let secret = "test_secret";
        let token = create_jwt("speedtest-client", secret, Duration::hours(1)).unwrap();
        let claims = validate_jwt(&token, secret).unwrap();
        assert_eq!(claims.subject().as_deref(), Some("speedtest-client"));
        assert!(claims.exp.is_some());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_jwt("client", "right", Duration::hours(1)).unwrap();
        assert!(validate_jwt(&token, "wrong").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = create_jwt("client", "s", Duration::hours(-2)).unwrap();
        assert!(validate_jwt(&token, "s").is_err());
    }

    #[test]
    fn test_token_without_exp_accepted() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &json!({ "device": "sensor-7" }),
            &EncodingKey::from_secret(b"s"),
        )
        .unwrap();
        let claims = validate_jwt(&token, "s").unwrap();
        assert_eq!(claims.sub, None);
        assert_eq!(claims.extra["device"], "sensor-7");
    }

    #[test]
    fn test_token_with_audience_accepted() {
        let exp = Utc::now().timestamp() + 3600;
        let token = encode(
            &Header::default(),
            &json!({ "sub": "client", "aud": "speedtest", "exp": exp }),
            &EncodingKey::from_secret(b"s"),
        )
        .unwrap();
        let claims = validate_jwt(&token, "s").unwrap();
        assert_eq!(claims.subject().as_deref(), Some("client"));
        assert_eq!(claims.extra["aud"], "speedtest");
    }

    #[test]
    fn test_numeric_subject_accepted() {
        let token = encode(
            &Header::default(),
            &json!({ "sub": 42 }),
            &EncodingKey::from_secret(b"s"),
        )
        .unwrap();
        let claims = validate_jwt(&token, "s").unwrap();
        assert_eq!(claims.sub, Some(json!(42)));
        assert_eq!(claims.subject().as_deref(), Some("42"));
    }

    #[test]
    fn test_just_expired_token_rejected() {
        let exp = Utc::now().timestamp() - 5;
        let token = encode(
            &Header::default(),
            &json!({ "sub": "client", "exp": exp }),
            &EncodingKey::from_secret(b"s"),
        )
        .unwrap();
        assert!(validate_jwt(&token, "s").is_err());
    }

    #[test]
    fn test_lifetime_hours_bounds() {
        assert_eq!(lifetime_hours(24).unwrap(), Duration::hours(24));
        assert!(lifetime_hours(0).is_err());
        assert!(lifetime_hours(-1).is_err());
        assert!(lifetime_hours(i64::MAX).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validate_jwt("not-a-token", "s").is_err());
        assert!(validate_jwt("", "s").is_err());
    }
}
