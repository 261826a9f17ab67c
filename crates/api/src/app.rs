use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use chrono::Duration as ChronoDuration;
use domain::services::{
    ExpirySweeper, RecordingNotifier, ReportLifecycleManager, ReportNotifier, TokenIssuer,
};
use domain::stores::memory::{InMemoryJobStore, InMemoryThresholdConfigStore, InMemoryTokenStore};
use domain::stores::{JobStore, ThresholdConfigStore, TokenStore};
use persistence::repositories::{
    DownloadTokenRepository, NotificationOutboxRepository, ReportJobRepository,
    ThresholdConfigRepository,
};
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    error_detail_middleware, metrics_handler, metrics_middleware, security_headers_middleware,
    trace_id,
};
use crate::routes::{downloads, health, reports, threshold_configs, worker_events};
use crate::services::{ArtifactStorage, SignedUrlStorage};

/// The stores and notifier the services run against.
pub struct Backend {
    pub jobs: Arc<dyn JobStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub thresholds: Arc<dyn ThresholdConfigStore>,
    pub notifier: Arc<dyn ReportNotifier>,
    /// Present for the PostgreSQL backend; used by health probes.
    pub pool: Option<PgPool>,
}

impl Backend {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            jobs: Arc::new(ReportJobRepository::new(pool.clone())),
            tokens: Arc::new(DownloadTokenRepository::new(pool.clone())),
            thresholds: Arc::new(ThresholdConfigRepository::new(pool.clone())),
            notifier: Arc::new(NotificationOutboxRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Process-local stores for tests and local development.
    pub fn in_memory() -> Self {
        Self::in_memory_with_notifier(Arc::new(RecordingNotifier::new()))
    }

    pub fn in_memory_with_notifier(notifier: Arc<dyn ReportNotifier>) -> Self {
        Self {
            jobs: Arc::new(InMemoryJobStore::new()),
            tokens: Arc::new(InMemoryTokenStore::new()),
            thresholds: Arc::new(InMemoryThresholdConfigStore::new()),
            notifier,
            pool: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub reports: Arc<ReportLifecycleManager>,
    pub downloads: Arc<TokenIssuer>,
    pub sweeper: Arc<ExpirySweeper>,
    pub thresholds: Arc<dyn ThresholdConfigStore>,
    pub storage: Arc<dyn ArtifactStorage>,
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Wire services over a backend. Fails only on unusable JWT keys.
    pub fn new(config: Config, backend: Backend) -> Result<Self, JwtError> {
        let jwt = config.jwt.verifier()?;
        let store_timeout = Duration::from_millis(config.reports.store_timeout_ms);

        let reports = Arc::new(
            ReportLifecycleManager::new(backend.jobs.clone(), backend.notifier)
                .with_store_timeout(store_timeout),
        );
        let downloads = TokenIssuer::new(backend.tokens.clone(), reports.clone()).with_ttls(
            ChronoDuration::seconds(config.reports.download_token_ttl_secs),
            ChronoDuration::seconds(config.reports.max_download_token_ttl_secs),
        );
        let sweeper = ExpirySweeper::new(backend.tokens, backend.jobs)
            .with_store_timeout(store_timeout);
        let storage = SignedUrlStorage::new(
            &config.storage.base_url,
            config.storage.signing_key.as_bytes(),
            ChronoDuration::seconds(config.storage.url_ttl_secs),
        );

        Ok(Self {
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            reports,
            downloads: Arc::new(downloads),
            sweeper: Arc::new(sweeper),
            thresholds: backend.thresholds,
            storage: Arc::new(storage),
            pool: backend.pool,
        })
    }

    pub fn store_timeout(&self) -> Duration {
        self.reports.store_timeout()
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Bearer JWT routes; the AuthenticatedPrincipal extractor rejects
    // anonymous callers.
    let user_routes = Router::new()
        .route(
            "/api/v1/reports",
            post(reports::create_report).get(reports::list_reports),
        )
        .route(
            "/api/v1/reports/:report_id",
            get(reports::get_report).delete(reports::delete_report),
        )
        .route(
            "/api/v1/reports/:report_id/regenerate",
            post(reports::regenerate_report),
        )
        .route(
            "/api/v1/reports/:report_id/download-token",
            post(reports::issue_download_token),
        )
        .route(
            "/api/v1/districts/:district_id/reports",
            get(reports::list_district_reports),
        )
        .route(
            "/api/v1/threshold-configs",
            get(threshold_configs::list_threshold_configs),
        )
        .route(
            "/api/v1/threshold-configs/:report_type",
            get(threshold_configs::get_threshold_config),
        )
        .route(
            "/api/v1/admin/threshold-configs/:report_type",
            put(threshold_configs::upsert_threshold_config),
        );

    // The token in the path is the credential
    let download_routes =
        Router::new().route("/api/v1/downloads/:token", get(downloads::redeem_download));

    // Worker callbacks, authenticated by X-Worker-Key
    let internal_routes = Router::new().route(
        "/api/internal/v1/reports/:report_id/events",
        post(worker_events::apply_event),
    );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(download_routes)
        .merge(internal_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error_detail_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::load_for_test(&[]).unwrap()
    }

    #[test]
    fn test_state_uses_configured_timeouts() {
        let config = Config::load_for_test(&[("reports.store_timeout_ms", "250")]).unwrap();
        let state = AppState::new(config, Backend::in_memory()).unwrap();
        assert_eq!(state.store_timeout(), Duration::from_millis(250));
        assert!(state.pool.is_none());
    }

    #[test]
    fn test_state_rejects_bad_jwt_keys() {
        let config = Config::load_for_test(&[
            ("jwt.algorithm", "RS256"),
            ("jwt.public_key", "not a pem"),
        ])
        .unwrap();
        assert!(AppState::new(config, Backend::in_memory()).is_err());
    }

    #[test]
    fn test_cors_layer_builds_for_both_modes() {
        let _ = cors_layer(&test_config());
        let mut config = test_config();
        config.security.cors_origins = vec!["https://reports.example.test".to_string()];
        let _ = cors_layer(&config);
    }
}
