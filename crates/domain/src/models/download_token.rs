//! Download token domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Download token prefix.
pub const TOKEN_PREFIX: &str = "dl_";

/// Random bytes per token (256 bits of entropy).
const TOKEN_RANDOM_BYTES: usize = 32;

/// Encoded length of a token: prefix plus unpadded base64 of the random bytes.
const TOKEN_LENGTH: usize = 3 + 43;

/// Default token lifetime when the caller does not ask for one.
pub const DEFAULT_DOWNLOAD_TOKEN_TTL_SECS: i64 = 300;

/// Longest lifetime a caller may request.
pub const MAX_DOWNLOAD_TOKEN_TTL_SECS: i64 = 3600;

/// A short-lived capability for one report's artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadToken {
    pub token: String,
    pub report_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl DownloadToken {
    /// A token is expired at and after its `expires_at` instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Generate a new download token string.
pub fn generate_download_token() -> String {
    shared::crypto::generate_secure_token(TOKEN_PREFIX, TOKEN_RANDOM_BYTES)
}

/// Cheap shape check so malformed input never reaches the store.
pub fn looks_like_download_token(token: &str) -> bool {
    token.len() == TOKEN_LENGTH
        && token.starts_with(TOKEN_PREFIX)
        && token[TOKEN_PREFIX.len()..]
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Request body for issuing a download token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueDownloadTokenRequest {
    #[validate(range(
        min = 1,
        max = MAX_DOWNLOAD_TOKEN_TTL_SECS,
        message = "ttlSecs is outside the allowed token lifetime"
    ))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<i64>,
}

/// Response returned after issuing a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTokenResponse {
    pub token: String,
    pub report_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub download_path: String,
}

impl From<DownloadToken> for DownloadTokenResponse {
    fn from(token: DownloadToken) -> Self {
        let download_path = format!("/api/v1/downloads/{}", token.token);
        Self {
            token: token.token,
            report_id: token.report_id,
            expires_at: token.expires_at,
            download_path,
        }
    }
}

/// A redeemed token resolved to its artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDownload {
    pub report_id: Uuid,
    pub result_location: String,
    pub expires_at: DateTime<Utc>,
}
