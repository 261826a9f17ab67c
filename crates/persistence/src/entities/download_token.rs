//! Download token entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the download_tokens table.
#[derive(Debug, Clone, FromRow)]
pub struct DownloadTokenEntity {
    pub token: String,
    pub report_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<DownloadTokenEntity> for domain::models::DownloadToken {
    fn from(entity: DownloadTokenEntity) -> Self {
        Self {
            token: entity.token,
            report_id: entity.report_id,
            expires_at: entity.expires_at,
            created_at: entity.created_at,
        }
    }
}
