//! Domain models for the report service.

pub mod download_token;
pub mod principal;
pub mod report_job;
pub mod threshold_config;

pub use download_token::{
    generate_download_token, DownloadToken, DownloadTokenResponse, IssueDownloadTokenRequest,
    ResolvedDownload, DEFAULT_DOWNLOAD_TOKEN_TTL_SECS, MAX_DOWNLOAD_TOKEN_TTL_SECS, TOKEN_PREFIX,
};
pub use principal::{Principal, Role};
pub use report_job::{
    CreateReportRequest, InvalidStatusCode, LifecycleEventAck, ListDistrictReportsQuery,
    ListReportsQuery, ListReportsResponse, ReportJob, ReportLifecycleEvent, ReportStatus,
    ReportType, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
pub use threshold_config::{ThresholdConfig, UpsertThresholdConfigRequest};
