//! Download token issuance and redemption.
//!
//! A token is a bearer capability for one completed report. It is valid
//! while it exists in the [`TokenStore`] and `now < expires_at`; validity is
//! checked against the store on every redemption.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::bounded;
use super::report_lifecycle::ReportLifecycleManager;
use crate::errors::ReportError;
use crate::models::download_token::looks_like_download_token;
use crate::models::{
    generate_download_token, DownloadToken, ResolvedDownload, DEFAULT_DOWNLOAD_TOKEN_TTL_SECS,
    MAX_DOWNLOAD_TOKEN_TTL_SECS,
};
use crate::stores::TokenStore;

/// Mints and validates download tokens.
pub struct TokenIssuer {
    tokens: Arc<dyn TokenStore>,
    reports: Arc<ReportLifecycleManager>,
    default_ttl: ChronoDuration,
    max_ttl: ChronoDuration,
    store_timeout: Duration,
}

impl TokenIssuer {
    pub fn new(tokens: Arc<dyn TokenStore>, reports: Arc<ReportLifecycleManager>) -> Self {
        let store_timeout = reports.store_timeout();
        Self {
            tokens,
            reports,
            default_ttl: ChronoDuration::seconds(DEFAULT_DOWNLOAD_TOKEN_TTL_SECS),
            max_ttl: ChronoDuration::seconds(MAX_DOWNLOAD_TOKEN_TTL_SECS),
            store_timeout,
        }
    }

    /// Override the default and maximum lifetimes.
    pub fn with_ttls(mut self, default_ttl: ChronoDuration, max_ttl: ChronoDuration) -> Self {
        self.default_ttl = default_ttl;
        self.max_ttl = max_ttl;
        self
    }

    pub fn default_ttl(&self) -> ChronoDuration {
        self.default_ttl
    }

    /// Mint a fresh token for a COMPLETED report.
    ///
    /// `ttl` defaults to the configured default and must be positive and no
    /// longer than the configured maximum.
    pub async fn issue(
        &self,
        report_id: Uuid,
        ttl: Option<ChronoDuration>,
    ) -> Result<DownloadToken, ReportError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl <= ChronoDuration::zero() || ttl > self.max_ttl {
            return Err(ReportError::Validation(format!(
                "token ttl must be between 1 and {} seconds",
                self.max_ttl.num_seconds()
            )));
        }

        self.reports.require_ready(report_id).await?;

        let now = Utc::now();
        let token = DownloadToken {
            token: generate_download_token(),
            report_id,
            expires_at: now + ttl,
            created_at: now,
        };
        bounded(self.store_timeout, "insert_token", self.tokens.insert(token.clone())).await?;

        tracing::info!(
            report_id = %report_id,
            expires_at = %token.expires_at,
            "Download token issued"
        );
        Ok(token)
    }

    /// Validate a token and return the report it is bound to.
    ///
    /// An expired token is deleted before `TokenExpired` is returned. A
    /// valid token is left in place and may be redeemed again until it
    /// expires.
    pub async fn redeem(&self, token: &str) -> Result<Uuid, ReportError> {
        self.validate(token).await.map(|t| t.report_id)
    }

    /// Redeem a token and re-read its report.
    ///
    /// A report deleted or no longer COMPLETED since issuance is reported
    /// through the lifecycle manager's errors.
    pub async fn resolve(&self, token: &str) -> Result<ResolvedDownload, ReportError> {
        let stored = self.validate(token).await?;
        let job = self.reports.require_ready(stored.report_id).await?;
        let result_location = job.result_location.ok_or_else(|| {
            ReportError::Corruption(format!(
                "completed report {} has no result location",
                stored.report_id
            ))
        })?;

        tracing::info!(report_id = %stored.report_id, "Download token redeemed");
        Ok(ResolvedDownload {
            report_id: stored.report_id,
            result_location,
            expires_at: stored.expires_at,
        })
    }

    async fn validate(&self, token: &str) -> Result<DownloadToken, ReportError> {
        if !looks_like_download_token(token) {
            return Err(ReportError::TokenNotFound);
        }

        let stored = bounded(self.store_timeout, "find_token", self.tokens.find(token))
            .await?
            .ok_or(ReportError::TokenNotFound)?;

        if stored.is_expired_at(Utc::now()) {
            // The sweeper may already have removed it; either way it is gone.
            bounded(self.store_timeout, "delete_token", self.tokens.delete(token)).await?;
            tracing::debug!(report_id = %stored.report_id, "Expired download token removed");
            return Err(ReportError::TokenExpired {
                expired_at: stored.expires_at,
            });
        }

        Ok(stored)
    }

    /// Delete every token bound to a report.
    pub async fn revoke_for_report(&self, report_id: Uuid) -> Result<u64, ReportError> {
        let revoked = bounded(
            self.store_timeout,
            "delete_tokens_for_report",
            self.tokens.delete_by_report_id(report_id),
        )
        .await?;
        if revoked > 0 {
            tracing::info!(report_id = %report_id, revoked = revoked, "Download tokens revoked");
        }
        Ok(revoked)
    }
}
