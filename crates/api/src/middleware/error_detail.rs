//! Internal error detail outside production.
//!
//! [`ApiError`](crate::error::ApiError) keeps internal messages out of the
//! response body and attaches them as an [`ErrorDetail`] extension instead.
//! Outside production this middleware copies that text into a `detail`
//! field so developers can see what failed.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ErrorDetail;

/// Error bodies are small; anything larger is passed through untouched.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

pub async fn error_detail_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if state.config.is_production() {
        return response;
    }
    attach_detail(response).await
}

async fn attach_detail(response: Response) -> Response {
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Could not buffer error body");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(serde_json::Value::Object(mut map)) => {
            map.insert("detail".to_string(), serde_json::Value::String(detail));
            serde_json::Value::Object(map).to_string().into_bytes()
        }
        _ => bytes.to_vec(),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use axum::response::IntoResponse;

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_detail_attached() {
        let response = ApiError::Internal("pool timed out".into()).into_response();
        let body = json(attach_detail(response).await).await;
        assert_eq!(body["message"], "An internal error occurred");
        assert_eq!(body["detail"], "pool timed out");
    }

    #[tokio::test]
    async fn test_client_errors_untouched() {
        let response = ApiError::NotFound("Report not found".into()).into_response();
        let body = json(attach_detail(response).await).await;
        assert!(body.get("detail").is_none());
    }
}
