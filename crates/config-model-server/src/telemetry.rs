//! Telemetry and tracing configuration
//!
//! This module configures structured logging for the registry server.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level
    pub log_level: String,

    /// Whether to use JSON formatting
    pub json_format: bool,

    /// Whether to include timestamps
    pub include_timestamps: bool,

    /// Whether to include thread IDs
    pub include_thread_ids: bool,

    /// Whether to include target module
    pub include_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_format: false,
            include_timestamps: true,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Create a new telemetry config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON formatting
    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    /// Configure timestamp inclusion
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.include_timestamps = enabled;
        self
    }

    /// Configure thread ID inclusion
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.include_thread_ids = enabled;
        self
    }

    /// Configure target module inclusion
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.include_target = enabled;
        self
    }

    /// Filter from `RUST_LOG`, falling back to the configured level
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_target(self.include_target)
            .with_thread_ids(self.include_thread_ids);

        match (self.json_format, self.include_timestamps) {
            (true, true) => layer
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_timer(fmt::time::SystemTime)
                .boxed(),
            (true, false) => layer
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .without_time()
                .boxed(),
            (false, true) => layer.with_timer(fmt::time::SystemTime).boxed(),
            (false, false) => layer.without_time().boxed(),
        }
    }
}

/// Initialize telemetry with custom configuration
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_with_config(config: TelemetryConfig) {
    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(config.env_filter())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_format);
        assert!(config.include_timestamps);
        assert!(!config.include_thread_ids);
        assert!(config.include_target);
    }

    #[test]
    fn test_telemetry_config_builder() {
        let config = TelemetryConfig::new()
            .with_log_level("debug")
            .with_json_format(true)
            .with_timestamps(false)
            .with_thread_ids(true)
            .with_target(false);

        assert_eq!(config.log_level, "debug");
        assert!(config.json_format);
        assert!(!config.include_timestamps);
        assert!(config.include_thread_ids);
        assert!(!config.include_target);
    }

    #[test]
    fn test_every_format_builds_a_layer() {
        for json in [true, false] {
            for timestamps in [true, false] {
                let config = TelemetryConfig::new()
                    .with_json_format(json)
                    .with_timestamps(timestamps);
                let _layer = config.fmt_layer();
            }
        }
    }
}
