use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for log output.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "incident_store" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: true,
        }
    }
}

/// Serialized form of [`TelemetryConfig`], with levels spelled as strings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub log_level: Option<String>,
    pub modules: Vec<(String, String)>,
    pub json: Option<bool>,
}

impl TryFrom<TelemetrySettings> for TelemetryConfig {
    type Error = String;

    fn try_from(settings: TelemetrySettings) -> Result<Self, Self::Error> {
        let defaults = TelemetryConfig::default();
        let parse = |raw: &str| {
            raw.parse::<Level>()
                .map_err(|_| format!("unknown log level: {raw}"))
        };
        let log_level = match settings.log_level.as_deref() {
            Some(raw) => parse(raw)?,
            None => defaults.log_level,
        };
        let module_levels = settings
            .modules
            .iter()
            .map(|(module, raw)| Ok((module.clone(), parse(raw.as_str())?)))
            .collect::<Result<Vec<_>, String>>()?;
        Ok(Self {
            log_level,
            module_levels,
            json: settings.json.unwrap_or(defaults.json),
        })
    }
}

/// Build the `EnvFilter` directive string for a config.
pub fn filter_directives(config: &TelemetryConfig) -> String {
    let mut filter_str = config.log_level.to_string().to_lowercase();
    for (module, level) in &config.module_levels {
        filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    filter_str
}

/// Install the global tracing subscriber. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(fmt_layer).try_init()
}
