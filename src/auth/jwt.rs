//! JWT token validation
//!
//! Tokens are issued by the external identity provider with a shared HMAC
//! secret. This module verifies signature and expiry and surfaces the
//! claims; it never decides authorization beyond carrying the permission
//! level. A dev-mode validator signs and accepts tokens under a fixed
//! insecure secret so local development needs no provider.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::PermissionLevel;
use crate::types::TransferableError;

const DEV_SECRET: &str = "dev-only-insecure-secret";

/// JWT claims carried by identity-provider tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity-provider user reference (stored as `UserDoc.clerk_id`)
    pub sub: String,
    /// Email or username the token was issued to
    pub email: String,
    /// Role for authorization checks
    #[serde(default)]
    pub permission_level: PermissionLevel,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Result of validating a token
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    fn ok(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(message.into()),
        }
    }
}

/// Validates (and in dev mode mints) JWT tokens
pub struct JwtValidator {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a validator for a production shared secret
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, TransferableError> {
        if secret.len() < 16 {
            return Err(TransferableError::Config(
                "JWT secret must be at least 16 characters".into(),
            ));
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        })
    }

    /// Create a dev-mode validator with the fixed insecure secret
    pub fn new_dev() -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(DEV_SECRET.as_bytes()),
            encoding_key: EncodingKey::from_secret(DEV_SECRET.as_bytes()),
            expiry_seconds: 86400,
        }
    }

    /// Verify a token and extract its claims
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        let validation = Validation::default();

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => TokenValidationResult::ok(data.claims),
            Err(e) => TokenValidationResult::err(format!("Invalid token: {}", e)),
        }
    }

    /// Mint a token (dev mode and tests; production tokens come from the
    /// identity provider)
    pub fn generate_token(
        &self,
        sub: &str,
        email: &str,
        permission_level: PermissionLevel,
    ) -> Result<String, TransferableError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let claims = Claims {
            sub: sub.to_string(),
            email: email.to_string(),
            permission_level,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TransferableError::Config(format!("Failed to sign token: {}", e)))
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }

    #[test]
    fn test_round_trip() {
        let jwt = JwtValidator::new_dev();
        let token = jwt
            .generate_token("user_abc", "student@example.edu", PermissionLevel::Authenticated)
            .unwrap();

        let result = jwt.verify_token(&token);
        assert!(result.valid);

        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, "user_abc");
        assert_eq!(claims.email, "student@example.edu");
        assert_eq!(claims.permission_level, PermissionLevel::Authenticated);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signer = JwtValidator::new("a-perfectly-long-secret".into(), 3600).unwrap();
        let token = signer
            .generate_token("user_abc", "student@example.edu", PermissionLevel::Admin)
            .unwrap();

        let verifier = JwtValidator::new("a-different-long-secret".into(), 3600).unwrap();
        let result = verifier.verify_token(&token);
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt = JwtValidator::new_dev();
        assert!(!jwt.verify_token("not-a-jwt").valid);
    }
}
