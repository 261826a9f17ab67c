//! Integration tests for download token issuance, redemption and expiry.
//!
//! Run with: cargo test --test downloads_integration

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use common::{delete_request_with_auth, get_request, json_request_with_auth, TestApp};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

fn issue_uri(report_id: Uuid) -> String {
    format!("/api/v1/reports/{}/download-token", report_id)
}

fn download_uri(token: &str) -> String {
    format!("/api/v1/downloads/{}", token)
}

/// A completed report owned by user 100 plus that user's bearer token.
async fn completed_report(app: &TestApp) -> (String, Uuid) {
    let token = app.user_token(100);
    let report_id = app.create_report(&token, "USER_ACTIVITY").await;
    app.complete_report(report_id, "s3://reports/7/activity.csv")
        .await;
    (token, report_id)
}

#[tokio::test]
async fn test_issue_requires_completed_report() {
    let app = TestApp::new();
    let token = app.user_token(100);
    let report_id = app.create_report(&token, "USER_ACTIVITY").await;

    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            &issue_uri(report_id),
            &token,
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    app.worker_event(report_id, json!({ "status": "PROCESSING" }))
        .await;
    let (status, _) = app
        .send(json_request_with_auth(
            Method::POST,
            &issue_uri(report_id),
            &token,
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_issue_token_success() {
    let app = TestApp::new();
    let (token, report_id) = completed_report(&app).await;

    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            &issue_uri(report_id),
            &token,
            json!({ "ttlSecs": 120 }),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let download_token = body["token"].as_str().unwrap();
    assert!(download_token.starts_with("dl_"));
    assert_eq!(body["reportId"], report_id.to_string());
    assert_eq!(
        body["downloadPath"],
        format!("/api/v1/downloads/{}", download_token)
    );
    assert!(body["expiresAt"].is_string());
}

#[tokio::test]
async fn test_issue_token_for_someone_elses_report() {
    let app = TestApp::new();
    let (_, report_id) = completed_report(&app).await;

    let (status, _) = app
        .send(json_request_with_auth(
            Method::POST,
            &issue_uri(report_id),
            &app.user_token(101),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_issue_token_rejects_out_of_range_ttl() {
    let app = TestApp::new();
    let (token, report_id) = completed_report(&app).await;

    for ttl in [0, -5, 7200] {
        let (status, body) = app
            .send(json_request_with_auth(
                Method::POST,
                &issue_uri(report_id),
                &token,
                json!({ "ttlSecs": ttl }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "ttl {}", ttl);
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn test_issue_token_body_handling() {
    let app = TestApp::new();
    let (token, report_id) = completed_report(&app).await;

    // Present but wrongly typed: rejected, not defaulted
    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            &issue_uri(report_id),
            &token,
            json!({ "ttlSecs": "60" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    // No body at all: default lifetime
    let request = Request::builder()
        .method(Method::POST)
        .uri(issue_uri(report_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    let expires_at: DateTime<Utc> = body["expiresAt"].as_str().unwrap().parse().unwrap();
    let remaining = expires_at - Utc::now();
    assert!(remaining > chrono::Duration::seconds(290));
    assert!(remaining <= chrono::Duration::seconds(300));
}

#[tokio::test]
async fn test_redeem_returns_signed_url() {
    let app = TestApp::new();
    let (token, report_id) = completed_report(&app).await;
    let download_token = app.issue_download_token(&token, report_id).await;

    // No bearer token: the download token is the credential
    let (status, body) = app.send(get_request(&download_uri(&download_token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reportId"], report_id.to_string());
    assert_eq!(body["resultLocation"], "s3://reports/7/activity.csv");
    let url = body["downloadUrl"].as_str().unwrap();
    assert!(url.starts_with("https://files.test.local/reports/"));
    assert!(url.contains("expires="));
    assert!(url.contains("signature="));
}

#[tokio::test]
async fn test_token_is_reusable_until_expiry() {
    let app = TestApp::new();
    let (token, report_id) = completed_report(&app).await;
    let download_token = app.issue_download_token(&token, report_id).await;

    for _ in 0..3 {
        let (status, _) = app.send(get_request(&download_uri(&download_token))).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_redeem_unknown_or_malformed_token() {
    let app = TestApp::new();

    let well_formed = format!("dl_{}", "A".repeat(43));
    for token in [well_formed.as_str(), "not-a-token", "dl_short"] {
        let (status, body) = app.send(get_request(&download_uri(token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "token {}", token);
        assert_eq!(body["error"], "not_found");
    }
}

#[tokio::test]
async fn test_expired_token_is_gone_then_not_found() {
    let app = TestApp::new();
    let (token, report_id) = completed_report(&app).await;

    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            &issue_uri(report_id),
            &token,
            json!({ "ttlSecs": 1 }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let download_token = body["token"].as_str().unwrap().to_string();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, body) = app.send(get_request(&download_uri(&download_token))).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "gone");

    // Redemption removed it
    let (status, _) = app.send(get_request(&download_uri(&download_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_report_revokes_tokens() {
    let app = TestApp::new();
    let (token, report_id) = completed_report(&app).await;
    let download_token = app.issue_download_token(&token, report_id).await;

    let (status, _) = app
        .send(delete_request_with_auth(
            &format!("/api/v1/reports/{}", report_id),
            &token,
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(get_request(&download_uri(&download_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_regenerating_report_revokes_old_tokens() {
    let app = TestApp::new();
    let (token, report_id) = completed_report(&app).await;
    let download_token = app.issue_download_token(&token, report_id).await;

    let (status, body) = app
        .send(json_request_with_auth(
            Method::POST,
            &format!("/api/v1/reports/{}/regenerate", report_id),
            &token,
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let new_id: Uuid = body["reportId"].as_str().unwrap().parse().unwrap();

    let (status, _) = app.send(get_request(&download_uri(&download_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The new run is not downloadable until it completes
    let (status, _) = app
        .send(json_request_with_auth(
            Method::POST,
            &issue_uri(new_id),
            &token,
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_sweeper_removes_expired_tokens() {
    let app = TestApp::new();
    let (token, report_id) = completed_report(&app).await;

    for _ in 0..2 {
        let (status, _) = app
            .send(json_request_with_auth(
                Method::POST,
                &issue_uri(report_id),
                &token,
                json!({ "ttlSecs": 1 }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let live_token = app.issue_download_token(&token, report_id).await;

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let report = app.state.sweeper.sweep().await.unwrap();
    assert_eq!(report.expired, 2);
    assert_eq!(report.orphaned, 0);

    let (status, _) = app.send(get_request(&download_uri(&live_token))).await;
    assert_eq!(status, StatusCode::OK);
}
