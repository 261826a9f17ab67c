//! Bearer JWT authentication extractor.
//!
//! This is the trust boundary: claims are verified and normalised into a
//! [`Principal`] here, and nothing downstream looks at raw claims.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use domain::models::Principal;
use shared::jwt::{Claims, JwtError};

use crate::app::AppState;
use crate::error::ApiError;

/// The verified caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

    Ok(token)
}

/// Maps verified claims onto a principal.
pub fn principal_from_claims(claims: &Claims) -> Result<Principal, JwtError> {
    let user_id = claims.user_id()?;
    Ok(Principal::from_raw_roles(
        user_id,
        claims.district_id,
        claims.roles.iter().map(String::as_str),
    ))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(AuthenticatedPrincipal(principal.clone()));
        }

        let token = bearer_token(&parts.headers)?;

        let principal = state
            .jwt
            .validate_token(token)
            .and_then(|claims| principal_from_claims(&claims))
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })?;

        parts.extensions.insert(principal.clone());
        Ok(AuthenticatedPrincipal(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use domain::models::Role;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers_with("bearer abc")).unwrap(), "abc");
        assert!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")).is_err());
        assert!(bearer_token(&headers_with("Bearer ")).is_err());
        assert!(bearer_token(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_principal_from_claims() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": "42",
            "exp": 0,
            "districtId": 7,
            "authorities": ["ROLE_DISTRICT_ADMIN", "ROLE_UNKNOWN"]
        }))
        .unwrap();

        let principal = principal_from_claims(&claims).unwrap();
        assert_eq!(principal.user_id, 42);
        assert_eq!(principal.district_id, Some(7));
        assert!(principal.has_role(Role::DistrictAdmin));
        assert_eq!(principal.roles.len(), 1);
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let claims: Claims =
            serde_json::from_value(serde_json::json!({ "sub": "someone", "exp": 0 })).unwrap();
        assert!(principal_from_claims(&claims).is_err());
    }
}
