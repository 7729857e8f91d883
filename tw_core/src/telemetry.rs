use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output for a terminal
    Pretty,
    /// One JSON object per line for log shippers
    Json,
}

impl LogFormat {
    /// Pick the format for a deployment environment name
    pub fn for_env(env: &str) -> Self {
        if env.eq_ignore_ascii_case("production") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Initialize tracing - safe to call multiple times
///
/// The filter comes from `RUST_LOG` when set, otherwise `info`.
pub fn init_tracing(env: &str, service: &str) {
    INIT.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        match LogFormat::for_env(env) {
            LogFormat::Json => tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().json())
                .with(env_filter)
                .init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().pretty())
                .with(env_filter)
                .init(),
        }

        tracing::info!(service = %service, env = %env, "Tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_idempotent() {
        init_tracing("test", "tripwire-test");
        init_tracing("test", "tripwire-test");
    }

    #[test]
    fn test_log_format_for_env() {
        assert_eq!(LogFormat::for_env("production"), LogFormat::Json);
        assert_eq!(LogFormat::for_env("PRODUCTION"), LogFormat::Json);
        assert_eq!(LogFormat::for_env("development"), LogFormat::Pretty);
        assert_eq!(LogFormat::for_env(""), LogFormat::Pretty);
    }
}
