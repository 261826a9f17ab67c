//! Logging initialization and configuration.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Crates whose debug output drowns the service's own events.
const NOISY_TARGETS: [&str; 3] = ["sqlx::query", "hyper", "tower_http::trace::on_body_chunk"];

/// Builds the default filter: the configured level for everything, capped
/// at `warn` for chatty dependencies unless `RUST_LOG` says otherwise.
pub fn default_filter_directive(level: &str) -> String {
    let mut directive = level.to_string();
    for target in NOISY_TARGETS {
        directive.push_str(&format!(",{}=warn", target));
    }
    directive
}

/// Initializes the logging subsystem based on configuration.
///
/// `logging.format` selects `json` (default for deployments), `compact`,
/// or `pretty`. Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter_directive(&config.level)));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            let json_layer = fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_target(true);
            subscriber.with(json_layer).try_init()
        }
        "compact" => subscriber
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
        _ => {
            let pretty_layer = fmt::layer()
                .pretty()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true);
            subscriber.with(pretty_layer).try_init()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_directive() {
        let directive = default_filter_directive("debug");
        assert!(directive.starts_with("debug,"));
        assert!(directive.contains("sqlx::query=warn"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }
}
