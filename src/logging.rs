use std::fmt;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("LOKI_ENABLED is true but LOKI_URL is not set")]
    MissingLokiUrl,
    #[error("invalid LOKI_URL '{url}': {source}")]
    InvalidLokiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },
    #[error("failed to build Loki layer: {0}")]
    Loki(String),
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Where log events go besides stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum LogSink {
    Console,
    Loki(url::Url),
}

impl fmt::Display for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSink::Console => f.write_str("console"),
            LogSink::Loki(url) => write!(f, "loki ({})", url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub sink: LogSink,
    pub service_name: String,
    pub environment: String,
    /// `EnvFilter` directives, e.g. `info,podcast_insight::external=debug`.
    pub filter: String,
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, LoggingError> {
        let sink = resolve_sink(
            std::env::var("LOKI_ENABLED").ok().as_deref(),
            std::env::var("LOKI_URL").ok().as_deref(),
        )?;

        Ok(Self {
            sink,
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "podcast-insight".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            filter: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
        })
    }
}

/// Loki is used only when explicitly enabled; the URL is then mandatory.
fn resolve_sink(enabled: Option<&str>, url: Option<&str>) -> Result<LogSink, LoggingError> {
    let enabled = enabled
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(false);
    if !enabled {
        return Ok(LogSink::Console);
    }

    let raw = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(LoggingError::MissingLokiUrl)?;
    url::Url::parse(raw)
        .map(LogSink::Loki)
        .map_err(|source| LoggingError::InvalidLokiUrl {
            url: raw.to_string(),
            source,
        })
}

fn build_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter {
        filter: directives.to_string(),
        message: e.to_string(),
    })
}

// Spawns the shipping task, so this must run inside a tokio runtime.
#[cfg(feature = "loki")]
fn loki_layer(
    config: &LoggingConfig,
    url: &url::Url,
) -> Result<Option<tracing_loki::Layer>, LoggingError> {
    let to_err = |e: tracing_loki::Error| LoggingError::Loki(e.to_string());
    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)
        .map_err(to_err)?
        .label("environment", &config.environment)
        .map_err(to_err)?
        .build_url(url.clone())
        .map_err(to_err)?;

    tokio::spawn(task);
    Ok(Some(layer))
}

#[cfg(not(feature = "loki"))]
fn loki_layer(
    _config: &LoggingConfig,
    _url: &url::Url,
) -> Result<Option<tracing_subscriber::layer::Identity>, LoggingError> {
    Ok(None)
}

/// Installs the global subscriber: env filter, stdout formatter and, when
/// configured, the Loki layer.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(&config.filter)?;
    let loki = match &config.sink {
        LogSink::Console => None,
        LogSink::Loki(url) => loki_layer(config, url)?,
    };
    let loki_active = loki.is_some();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(loki)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    if matches!(config.sink, LogSink::Loki(_)) && !loki_active {
        tracing::warn!("Loki requested but the `loki` feature is disabled; logging to console only");
    }
    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        sink = %config.sink,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_unless_loki_enabled() {
        assert_eq!(resolve_sink(None, None).unwrap(), LogSink::Console);
        assert_eq!(resolve_sink(Some("false"), Some("http://loki:3100")).unwrap(), LogSink::Console);
        assert_eq!(resolve_sink(Some("yes"), None).unwrap(), LogSink::Console);
    }

    #[test]
    fn test_loki_requires_url() {
        assert!(matches!(
            resolve_sink(Some("true"), None),
            Err(LoggingError::MissingLokiUrl)
        ));
        assert!(matches!(
            resolve_sink(Some("true"), Some("  ")),
            Err(LoggingError::MissingLokiUrl)
        ));
    }

    #[test]
    fn test_loki_url_is_parsed() {
        let sink = resolve_sink(Some(" true "), Some("http://loki:3100")).unwrap();
        assert_eq!(sink.to_string(), "loki (http://loki:3100/)");

        assert!(matches!(
            resolve_sink(Some("true"), Some("not a url")),
            Err(LoggingError::InvalidLokiUrl { .. })
        ));
    }

    #[test]
    fn test_filter_directives_are_validated() {
        assert!(build_filter("info,podcast_insight::external=debug").is_ok());
        assert!(matches!(
            build_filter("podcast_insight=loudest"),
            Err(LoggingError::InvalidFilter { .. })
        ));
    }
}
