//! Tracing subscriber setup.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` if set, otherwise the configured level for our crates.
///
/// # Errors
/// Returns an error if `RUST_LOG` or the configured level is not a valid directive.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(from_env.as_deref(), config)
}

fn filter_from(from_env: Option<&str>, config: &LoggingConfig) -> Result<EnvFilter> {
    if let Some(directives) = from_env.filter(|d| !d.trim().is_empty()) {
        return Ok(EnvFilter::try_new(directives)?);
    }

    Ok(EnvFilter::default()
        .add_directive(format!("hfp_route_core={}", config.level).parse()?)
        .add_directive(format!("hfp_route_runtime={}", config.level).parse()?)
        .add_directive(format!("hfp_route_replay={}", config.level).parse()?))
}

/// Install the global tracing subscriber.
///
/// # Errors
/// Returns an error if the level is invalid or a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let installed = if config.json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_levels() {
        for level in ["error", "warn", "info", "debug", "trace"] {
            let config = LoggingConfig { level: level.to_string(), json: false };
            let filter = filter_from(None, &config).unwrap();
            let rendered = filter.to_string().to_lowercase();
            assert!(rendered.contains(&format!("hfp_route_core={level}")), "{rendered}");
        }
    }

    #[test]
    fn test_filter_rejects_garbage_level() {
        let config = LoggingConfig { level: "very loud".to_string(), json: false };
        assert!(filter_from(None, &config).is_err());
    }

    #[test]
    fn test_rust_log_overrides_configured_level() {
        let config = LoggingConfig::default();

        let filter =
            filter_from(Some("hfp_route_core=trace"), &config).unwrap().to_string().to_lowercase();

        assert!(filter.contains("hfp_route_core=trace"), "{filter}");
        assert!(!filter.contains("hfp_route_core=info"), "{filter}");
    }

    #[test]
    fn test_blank_rust_log_uses_configured_level() {
        let config = LoggingConfig { level: "debug".to_string(), json: false };

        let filter = filter_from(Some("  "), &config).unwrap().to_string().to_lowercase();

        assert!(filter.contains("hfp_route_runtime=debug"), "{filter}");
    }
}
