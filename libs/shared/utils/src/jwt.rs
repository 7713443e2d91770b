use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Deserialize)]
struct JwtHeader {
    alg: String,
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, String> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        debug!("Failed to decode token {}: {}", what, e);
        format!("Invalid {} encoding", what)
    })
}

/// Check an HS256 token against `jwt_secret` and build the caller's `User`.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err("Invalid token format".to_string()),
    };

    let header: JwtHeader = serde_json::from_slice(&decode_segment(header_b64, "header")?)
        .map_err(|_| "Invalid header format".to_string())?;
    if header.alg != "HS256" {
        return Err(format!("Unsupported signing algorithm {}", header.alg));
    }

    let signature = decode_segment(signature_b64, "signature")?;
    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());
    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims: JwtClaims = serde_json::from_slice(&decode_segment(claims_b64, "claims")?)
        .map_err(|e| {
            debug!("Failed to parse claims: {}", e);
            "Invalid claims format".to_string()
        })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        metadata: claims.user_metadata,
        created_at,
    };

    debug!("Token validated for user: {}", user.id);
    Ok(user)
}

#[cfg(all(test, feature = "test-utils"))]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn accepts_signed_token() {
        let user = TestUser::staff("nurse@glenmore.test");
        let token = JwtTestUtils::create_test_token(&user, SECRET, None);
        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.role.as_deref(), Some("staff"));
    }

    #[test]
    fn rejects_bad_tokens() {
        let user = TestUser::default();
        assert_eq!(
            validate_token(&JwtTestUtils::create_expired_token(&user, SECRET), SECRET).unwrap_err(),
            "Token expired"
        );
        assert_eq!(
            validate_token(&JwtTestUtils::create_invalid_signature_token(&user), SECRET).unwrap_err(),
            "Invalid token signature"
        );
        assert_matches!(validate_token("a.b", SECRET), Err(e) if e == "Invalid token format");
        assert_matches!(validate_token("anything", ""), Err(_));
    }
}
