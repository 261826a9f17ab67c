//! JWT verification utilities.
//!
//! Tokens are issued by the platform's identity provider. This module only
//! verifies them and normalises the claim names different issuers use, so
//! that the rest of the service sees a single claim shape.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(String),

    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// JWT token claims after name normalisation.
///
/// Issuers disagree on claim names (`district_id` vs `districtId`,
/// `roles` vs `authorities`, a single `role` string vs a list). The serde
/// aliases below fold all of them into one shape at deserialisation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (numeric user ID, serialised as a string).
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// JWT ID
    #[serde(default)]
    pub jti: Option<String>,
    /// Tenant the user belongs to.
    #[serde(
        default,
        alias = "districtId",
        alias = "district",
        deserialize_with = "int_or_string"
    )]
    pub district_id: Option<i64>,
    /// Raw role names as issued.
    #[serde(
        default,
        alias = "authorities",
        alias = "role",
        deserialize_with = "string_or_seq"
    )]
    pub roles: Vec<String>,
}

impl Claims {
    /// Parses the numeric user ID from the subject claim.
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub.parse::<i64>().map_err(|_| JwtError::InvalidToken)
    }
}

fn int_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(v)) => Ok(Some(v)),
        Some(Raw::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Str(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        // Some issuers pack roles into a space or comma separated scope string
        Some(Raw::One(s)) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Raw::Many(v)) => v,
    })
}

/// Configuration for JWT validation.
#[derive(Clone)]
pub struct JwtConfig {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    /// Leeway in seconds for clock skew tolerance (default: 30)
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("leeway_secs", &self.leeway_secs)
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

/// Default leeway in seconds for clock skew tolerance
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

impl JwtConfig {
    /// Creates an RS256 config from the issuer's PEM public key.
    pub fn rs256(public_key_pem: &str, leeway_secs: u64) -> Result<Self, JwtError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid public key: {}", e)))?;

        Ok(Self {
            algorithm: Algorithm::RS256,
            decoding_key,
            leeway_secs,
        })
    }

    /// Creates an HS256 config from a shared secret.
    ///
    /// Callers are responsible for refusing this outside development
    /// environments.
    pub fn hs256(secret: &str, leeway_secs: u64) -> Result<Self, JwtError> {
        if secret.len() < 16 {
            return Err(JwtError::InvalidKey(
                "HS256 secret must be at least 16 bytes".to_string(),
            ));
        }
        Ok(Self {
            algorithm: Algorithm::HS256,
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            leeway_secs,
        })
    }

    /// Returns the algorithm this config signs and verifies with.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Validates a token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature
                | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}

/// Token minting for tests and local tooling. The service itself only
/// verifies tokens issued by the identity provider.
#[cfg(any(test, feature = "test-support"))]
pub mod testing {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    use super::{Claims, JwtError};
    use crate::crypto::generate_secure_token;

    pub struct TokenSigner {
        algorithm: Algorithm,
        key: EncodingKey,
    }

    impl TokenSigner {
        pub fn rs256(private_key_pem: &str) -> Result<Self, JwtError> {
            let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
                .map_err(|e| JwtError::InvalidKey(format!("Invalid private key: {}", e)))?;
            Ok(Self {
                algorithm: Algorithm::RS256,
                key,
            })
        }

        pub fn hs256(secret: &str) -> Self {
            Self {
                algorithm: Algorithm::HS256,
                key: EncodingKey::from_secret(secret.as_bytes()),
            }
        }

        /// Mints a token for `user_id` that expires after `expiry_secs`.
        pub fn issue(
            &self,
            user_id: i64,
            district_id: Option<i64>,
            roles: &[&str],
            expiry_secs: i64,
        ) -> Result<String, JwtError> {
            let now = Utc::now();
            let claims = Claims {
                sub: user_id.to_string(),
                exp: (now + Duration::seconds(expiry_secs)).timestamp(),
                iat: now.timestamp(),
                jti: Some(generate_secure_token("jti_", 16)),
                district_id,
                roles: roles.iter().map(|r| r.to_string()).collect(),
            };

            encode(&Header::new(self.algorithm), &claims, &self.key)
                .map_err(|e| JwtError::EncodingError(e.to_string()))
        }
    }
}
