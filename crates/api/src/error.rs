use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::ReportError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation failed on {} field(s)", .0.len())]
    InvalidFields(Vec<ValidationDetail>),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Backing store did not answer in time. The message is internal.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

/// Internal error text attached to a response for the error detail
/// middleware. Never serialized by the error itself.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut detail = None;
        let mut details = None;
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Gone(msg) => (StatusCode::GONE, "gone", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::InvalidFields(fields) => {
                let message = if fields.len() == 1 {
                    fields[0].message.clone()
                } else {
                    format!("{} validation errors", fields.len())
                };
                details = Some(fields);
                (StatusCode::BAD_REQUEST, "validation_error", message)
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                detail = Some(msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::StoreUnavailable(msg) => {
                tracing::warn!("Store unavailable: {}", msg);
                detail = Some(msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    "Report storage is temporarily unavailable".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(msg) => ApiError::Validation(msg),
            e @ ReportError::UnsupportedReportType(_) => ApiError::Validation(e.to_string()),
            ReportError::Forbidden { .. } => {
                ApiError::Forbidden("You do not have access to this report".into())
            }
            ReportError::NotFound { .. } => ApiError::NotFound("Report not found".into()),
            ReportError::TokenNotFound => ApiError::NotFound("Download token not found".into()),
            e @ ReportError::TokenExpired { .. } => ApiError::Gone(e.to_string()),
            e @ (ReportError::NotReady { .. } | ReportError::IllegalTransition { .. }) => {
                ApiError::Conflict(e.to_string())
            }
            e @ ReportError::StoreTimeout { .. } => ApiError::StoreUnavailable(e.to_string()),
            e @ (ReportError::Corruption(_) | ReportError::Store(_)) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                })
            })
            .collect();

        ApiError::InvalidFields(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use domain::models::ReportStatus;
    use uuid::Uuid;
    use validator::Validate;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn status_of(err: ReportError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_report_error_status_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(status_of(ReportError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(ReportError::UnsupportedReportType("PDF".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(ReportError::Forbidden { report_id: id }), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ReportError::NotFound { report_id: id }), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ReportError::TokenNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ReportError::TokenExpired {
                expired_at: chrono::Utc::now()
            }),
            StatusCode::GONE
        );
        assert_eq!(
            status_of(ReportError::NotReady {
                report_id: id,
                status: ReportStatus::Queued
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ReportError::IllegalTransition {
                report_id: id,
                from: ReportStatus::Completed,
                to: ReportStatus::Processing
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ReportError::StoreTimeout {
                operation: "find_job",
                timeout_ms: 5
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ReportError::Corruption("status 9".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ReportError::Store("pool closed".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_message_is_hidden() {
        let response = ApiError::Internal("relation report_jobs does not exist".into())
            .into_response();
        let detail = response.extensions().get::<ErrorDetail>().cloned();
        assert_eq!(
            detail.map(|d| d.0).as_deref(),
            Some("relation report_jobs does not exist")
        );

        let body = body_json(response).await;
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn test_forbidden_does_not_leak_report_id() {
        let id = Uuid::new_v4();
        let body = body_json(ApiError::from(ReportError::Forbidden { report_id: id }).into_response())
            .await;
        assert!(!body.to_string().contains(&id.to_string()));
    }

    #[tokio::test]
    async fn test_validation_errors_carry_details() {
        let request = domain::models::UpsertThresholdConfigRequest {
            max_rows: 0,
            max_file_size_bytes: 10,
        };
        let err = ApiError::from(request.validate().unwrap_err());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "maxRows must be positive");
        assert_eq!(body["details"][0]["field"], "max_rows");
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            format!("{}", ApiError::Unauthorized("test".to_string())),
            "Unauthorized: test"
        );
        assert_eq!(
            format!("{}", ApiError::Gone("test".to_string())),
            "Gone: test"
        );
        assert_eq!(
            format!("{}", ApiError::Validation("test".to_string())),
            "Validation error: test"
        );
        assert_eq!(
            format!("{}", ApiError::ServiceUnavailable("test".to_string())),
            "Service unavailable: test"
        );
    }

    #[test]
    fn test_simple_variants_status() {
        assert_eq!(
            ApiError::Unauthorized("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::ServiceUnavailable("x".into()).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert!(ApiError::ServiceUnavailable("x".into())
            .into_response()
            .extensions()
            .get::<ErrorDetail>()
            .is_none());
    }
}
