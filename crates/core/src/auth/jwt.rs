//! Optional JWT exchange (spec §4.11 "JWT exchange"): `/auth/login` trades a
//! validated API key for a short-lived signed token carrying the key id and
//! permissions, so a client need not resend the raw secret on every request.

use crate::error::{CoreError, CoreResult};
use crate::types::Permission;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token lifetime (spec §4.11: "exp = now + 30m").
pub const TOKEN_TTL_SECS: i64 = 30 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// API key id this token was exchanged for.
    pub sub: String,
    pub permissions: Vec<Permission>,
    pub exp: i64,
    pub iat: i64,
}

/// Sign a token for `key_id` carrying `permissions`, expiring in [`TOKEN_TTL_SECS`].
pub fn issue(secret: &str, key_id: &str, permissions: Vec<Permission>) -> CoreResult<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims { sub: key_id.to_string(), permissions, exp: now + TOKEN_TTL_SECS, iat: now };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| CoreError::Internal(format!("jwt sign failed: {e}")))
}

/// Verify and decode a bearer JWT. Expired or mis-signed tokens are
/// `Unauthenticated`, matching a stale/invalid API key (spec §7).
pub fn verify(secret: &str, token: &str) -> CoreResult<Claims> {
    let validation = Validation::default();
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| CoreError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trips() {
        let token = issue("secret", "key-1", vec![Permission::Search]).unwrap();
        let claims = verify("secret", &token).unwrap();
        assert_eq!(claims.sub, "key-1");
        assert_eq!(claims.permissions, vec![Permission::Search]);
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let token = issue("secret", "key-1", vec![Permission::Search]).unwrap();
        assert!(verify("other-secret", &token).is_err());
    }
}
