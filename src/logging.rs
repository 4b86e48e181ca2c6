use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global tracing subscriber
///
/// `level` is an env-filter directive (`info`, `db_bootstrap=debug`, ...);
/// an unparsable directive falls back to `info`. `style = "json"` selects
/// JSON lines, anything else the human-readable format.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.style.as_str() {
        "json" => tracing_subscriber::fmt().json().with_env_filter(filter).try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let config = LoggingConfig {
            level: "not a directive ===".to_string(),
            style: "auto".to_string(),
        };
        // whichever call wins, only one global subscriber can be installed
        let first = init_tracing(&config);
        let second = init_tracing(&config);
        assert!(first.is_err() || second.is_err());
    }
}
