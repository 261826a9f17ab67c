//! Worker authentication extractor.
//!
//! Report workers post lifecycle events with an `X-Worker-Key` header. Only
//! SHA-256 digests of accepted keys are configured; the presented key is
//! hashed and compared in constant time.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use shared::crypto::{constant_time_eq, sha256_hex};

use crate::app::AppState;
use crate::error::ApiError;

pub const WORKER_KEY_HEADER: &str = "x-worker-key";

/// Proof that the request came from a configured worker.
#[derive(Debug, Clone)]
pub struct WorkerAuth {
    /// First characters of the matched digest, for logs.
    pub key_fingerprint: String,
}

impl WorkerAuth {
    /// Checks a presented key against the configured digests.
    ///
    /// Every configured digest is compared so timing does not reveal which
    /// one matched.
    pub fn validate(presented: &str, accepted_hashes: &[String]) -> Result<Self, ApiError> {
        if presented.is_empty() {
            return Err(ApiError::Unauthorized("Invalid worker key".to_string()));
        }

        let digest = sha256_hex(presented);
        let matched = accepted_hashes.iter().fold(false, |found, accepted| {
            constant_time_eq(&digest, &accepted.to_ascii_lowercase()) | found
        });

        if !matched {
            tracing::warn!("Rejected lifecycle event with unknown worker key");
            return Err(ApiError::Unauthorized("Invalid worker key".to_string()));
        }

        Ok(WorkerAuth {
            key_fingerprint: digest[..8].to_string(),
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for WorkerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(WORKER_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing X-Worker-Key header".to_string()))?;

        WorkerAuth::validate(presented.trim(), &state.config.worker.api_key_hashes)
    }
}
