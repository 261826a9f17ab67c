//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod download_token;
pub mod report_job;
pub mod threshold_config;

pub use download_token::DownloadTokenEntity;
pub use report_job::ReportJobEntity;
pub use threshold_config::ThresholdConfigEntity;
