use domain::models::MAX_DOWNLOAD_TOKEN_TTL_SECS;
use serde::Deserialize;
use shared::jwt::{JwtConfig, JwtError};
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Deployment environment: development, test, staging or production.
    #[serde(default = "default_environment")]
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// JWT verification configuration
    pub jwt: JwtAuthConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Grace period for in-flight requests and background jobs on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RS256 (default) or HS256. HS256 is refused in production.
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,

    /// RSA public key in PEM format for verifying tokens
    #[serde(default)]
    pub public_key: String,

    /// Shared secret for HS256
    #[serde(default)]
    pub secret: String,

    /// Leeway in seconds for clock skew tolerance (default: 30)
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

impl JwtAuthConfig {
    /// Build the verifier for incoming bearer tokens.
    pub fn verifier(&self) -> Result<JwtConfig, JwtError> {
        match self.algorithm.to_uppercase().as_str() {
            "RS256" => JwtConfig::rs256(&self.public_key, self.leeway_secs),
            "HS256" => JwtConfig::hs256(&self.secret, self.leeway_secs),
            other => Err(JwtError::InvalidKey(format!(
                "Unsupported JWT algorithm: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportsConfig {
    /// Lifetime of a download token when the client does not ask for one
    #[serde(default = "default_download_token_ttl")]
    pub download_token_ttl_secs: i64,

    /// Longest lifetime a client may request
    #[serde(default = "default_max_download_token_ttl")]
    pub max_download_token_ttl_secs: i64,

    /// Deadline for a single store call
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// How often the token sweeper runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            download_token_ttl_secs: default_download_token_ttl(),
            max_download_token_ttl_secs: default_max_download_token_ttl(),
            store_timeout_ms: default_store_timeout_ms(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the artifact download endpoint
    pub base_url: String,

    /// HMAC key used to sign retrieval URLs
    #[serde(default)]
    pub signing_key: String,

    /// Upper bound on a signed URL's lifetime
    #[serde(default = "default_url_ttl")]
    pub url_ttl_secs: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerConfig {
    /// SHA-256 hex digests of accepted `X-Worker-Key` values
    #[serde(default)]
    pub api_key_hashes: Vec<String>,
}

// Default value functions
fn default_environment() -> String {
    "development".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_shutdown_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_jwt_algorithm() -> String {
    "RS256".to_string()
}
fn default_jwt_leeway() -> u64 {
    30 // 30 seconds for clock skew tolerance
}
fn default_download_token_ttl() -> i64 {
    300
}
fn default_max_download_token_ttl() -> i64 {
    MAX_DOWNLOAD_TOKEN_TTL_SECS
}
fn default_store_timeout_ms() -> u64 {
    5000
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_url_ttl() -> i64 {
    300
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Baseline values for every section, so tests do not depend on files.
const TEST_DEFAULTS: &str = r#"
    environment = "test"

    [server]
    host = "127.0.0.1"
    port = 8080
    request_timeout_secs = 30
    shutdown_timeout_secs = 5

    [database]
    url = ""
    max_connections = 20
    min_connections = 5
    connect_timeout_secs = 10
    idle_timeout_secs = 600

    [logging]
    level = "info"
    format = "json"

    [security]
    cors_origins = []

    [jwt]
    algorithm = "HS256"
    secret = "test-secret-key-for-report-service"
    leeway_secs = 0

    [reports]
    download_token_ttl_secs = 300
    max_download_token_ttl_secs = 3600
    store_timeout_ms = 5000
    sweep_interval_secs = 60

    [storage]
    base_url = "https://files.test.local/reports"
    signing_key = "test-storage-signing-key"
    url_ttl_secs = 300

    [worker]
    api_key_hashes = []
"#;

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with RS__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("RS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .with_list_parse_key("worker.api_key_hashes")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Build a configuration from embedded test defaults plus overrides.
    ///
    /// Does not read files and skips validation, so callers can construct
    /// partial or deliberately invalid configs.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(TEST_DEFAULTS, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        // Database URL is required
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "RS__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        // Validate port range
        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        // Validate connection pool settings
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        self.validate_jwt()?;
        self.validate_reports()?;

        if self.storage.base_url.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "storage.base_url".to_string(),
            ));
        }
        if self.storage.signing_key.len() < 16 {
            return Err(ConfigValidationError::InvalidValue(
                "storage.signing_key must be at least 16 bytes".to_string(),
            ));
        }
        if self.storage.url_ttl_secs <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "storage.url_ttl_secs must be positive".to_string(),
            ));
        }

        for hash in &self.worker.api_key_hashes {
            if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ConfigValidationError::InvalidValue(
                    "worker.api_key_hashes must be SHA-256 hex digests".to_string(),
                ));
            }
        }
        if self.is_production() && self.worker.api_key_hashes.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "worker.api_key_hashes must be set in production".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_jwt(&self) -> Result<(), ConfigValidationError> {
        match self.jwt.algorithm.to_uppercase().as_str() {
            "RS256" => {
                if self.jwt.public_key.trim().is_empty() {
                    return Err(ConfigValidationError::MissingRequired(
                        "jwt.public_key is required for RS256".to_string(),
                    ));
                }
            }
            "HS256" => {
                if self.is_production() {
                    return Err(ConfigValidationError::InvalidValue(
                        "HS256 shared secrets are not allowed in production".to_string(),
                    ));
                }
                if self.jwt.secret.len() < 16 {
                    return Err(ConfigValidationError::InvalidValue(
                        "jwt.secret must be at least 16 bytes".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "Unsupported jwt.algorithm: {}",
                    other
                )))
            }
        }
        Ok(())
    }

    fn validate_reports(&self) -> Result<(), ConfigValidationError> {
        let reports = &self.reports;
        if reports.max_download_token_ttl_secs <= 0
            || reports.max_download_token_ttl_secs > MAX_DOWNLOAD_TOKEN_TTL_SECS
        {
            return Err(ConfigValidationError::InvalidValue(format!(
                "reports.max_download_token_ttl_secs must be between 1 and {}",
                MAX_DOWNLOAD_TOKEN_TTL_SECS
            )));
        }
        if reports.download_token_ttl_secs <= 0
            || reports.download_token_ttl_secs > reports.max_download_token_ttl_secs
        {
            return Err(ConfigValidationError::InvalidValue(
                "reports.download_token_ttl_secs must be positive and within the maximum"
                    .to_string(),
            ));
        }
        if reports.store_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "reports.store_timeout_ms cannot be 0".to_string(),
            ));
        }
        if reports.sweep_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "reports.sweep_interval_secs cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                ConfigValidationError::InvalidValue(format!(
                    "Invalid socket address {}:{}",
                    self.server.host, self.server.port
                ))
            })
    }
}
