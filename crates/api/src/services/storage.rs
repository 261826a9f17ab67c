//! Artifact storage collaborator.
//!
//! Reports are produced and uploaded by workers; this service only hands
//! out time-limited retrieval URLs for a completed report's
//! `result_location`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use shared::crypto::{hmac_sha256_hex, SigningError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Result location is empty")]
    EmptyLocation,

    #[error("URL signing failed: {0}")]
    Signing(#[from] SigningError),
}

/// Produces a URL from which an artifact can be fetched.
pub trait ArtifactStorage: Send + Sync {
    /// URL for `result_location`, valid no later than `expires_at`.
    fn retrieval_url(
        &self,
        result_location: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, StorageError>;
}

/// Signs retrieval URLs with HMAC-SHA256 for a storage gateway that shares
/// the key.
///
/// URL shape: `{base_url}/{b64url(location)}?expires={unix}&signature={hex}`
/// where the signature covers `"{b64url(location)}\n{unix}"`.
pub struct SignedUrlStorage {
    base_url: String,
    signing_key: Vec<u8>,
    max_url_ttl: Duration,
}

impl SignedUrlStorage {
    pub fn new(base_url: &str, signing_key: &[u8], max_url_ttl: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            signing_key: signing_key.to_vec(),
            max_url_ttl,
        }
    }

    fn signing_input(encoded_location: &str, expires: i64) -> String {
        format!("{}\n{}", encoded_location, expires)
    }
}

impl ArtifactStorage for SignedUrlStorage {
    fn retrieval_url(
        &self,
        result_location: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        if result_location.trim().is_empty() {
            return Err(StorageError::EmptyLocation);
        }

        // Never outlive the token, never exceed the configured URL lifetime.
        let cap = Utc::now() + self.max_url_ttl;
        let expires = expires_at.min(cap).timestamp();

        let encoded = URL_SAFE_NO_PAD.encode(result_location.as_bytes());
        let signature =
            hmac_sha256_hex(&self.signing_key, &Self::signing_input(&encoded, expires))?;

        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.base_url, encoded, expires, signature
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test-storage-signing-key";

    fn storage() -> SignedUrlStorage {
        SignedUrlStorage::new("https://files.example.test/reports/", KEY, Duration::seconds(300))
    }

    fn split(url: &str) -> (String, i64, String) {
        let rest = url
            .strip_prefix("https://files.example.test/reports/")
            .unwrap();
        let (encoded, query) = rest.split_once('?').unwrap();
        let mut expires = 0;
        let mut signature = String::new();
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("signature", v) => signature = v.to_string(),
                _ => {}
            }
        }
        (encoded.to_string(), expires, signature)
    }

    fn expected_signature(key: &[u8], encoded: &str, expires: i64) -> String {
        hmac_sha256_hex(key, &SignedUrlStorage::signing_input(encoded, expires)).unwrap()
    }

    #[test]
    fn test_signed_url_shape() {
        let storage = storage();
        let expires_at = Utc::now() + Duration::seconds(60);
        let url = storage
            .retrieval_url("s3://bucket/district-7/report.csv", expires_at)
            .unwrap();

        let (encoded, expires, signature) = split(&url);
        assert_eq!(expires, expires_at.timestamp());
        assert_eq!(
            URL_SAFE_NO_PAD.decode(&encoded).unwrap(),
            b"s3://bucket/district-7/report.csv"
        );
        assert_eq!(signature, expected_signature(KEY, &encoded, expires));
    }

    #[test]
    fn test_signature_binds_location_expiry_and_key() {
        let url = storage()
            .retrieval_url("s3://bucket/a.csv", Utc::now() + Duration::seconds(60))
            .unwrap();
        let (encoded, expires, signature) = split(&url);

        let other = URL_SAFE_NO_PAD.encode("s3://bucket/b.csv");
        assert_ne!(signature, expected_signature(KEY, &other, expires));
        assert_ne!(signature, expected_signature(KEY, &encoded, expires + 3600));
        assert_ne!(signature, expected_signature(b"another-key", &encoded, expires));
    }

    #[test]
    fn test_expiry_capped_by_url_ttl() {
        let url = storage()
            .retrieval_url("s3://bucket/a.csv", Utc::now() + Duration::hours(1))
            .unwrap();
        let (_, expires, _) = split(&url);
        assert!(expires <= (Utc::now() + Duration::seconds(300)).timestamp());
    }

    #[test]
    fn test_empty_location_rejected() {
        assert!(matches!(
            storage().retrieval_url("  ", Utc::now()),
            Err(StorageError::EmptyLocation)
        ));
    }
}
