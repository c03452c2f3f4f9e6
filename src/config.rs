use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::indicators::IndicatorSettings;

/// Summary prefix a sentiment source uses to signal that the upstream call failed.
pub const SENTIMENT_FAILURE_MARKER: &str = "Sentiment extraction failed";

/// Upper bound on a caller-supplied lookback, roughly ten years.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secret(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read-only settings for the enrichment pipeline.
///
/// Built once at startup and handed to the orchestrator's constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentConfig {
    /// Trailing window of price points fed to the indicators.
    pub lookback_days: u32,
    pub indicators: IndicatorSettings,
    pub failure_marker: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            lookback_days: 120,
            indicators: IndicatorSettings::default(),
            failure_marker: SENTIMENT_FAILURE_MARKER.to_string(),
        }
    }
}

impl EnrichmentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lookback_days: env_or("TA_LOOKBACK_DAYS", defaults.lookback_days),
            indicators: IndicatorSettings {
                sma_period: env_or("TA_SMA_PERIOD", defaults.indicators.sma_period),
                rsi_period: env_or("TA_RSI_PERIOD", defaults.indicators.rsi_period),
            },
            failure_marker: defaults.failure_marker,
        }
    }
}

/// Credentials and pacing for the historical price providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub finmind_token: Option<String>,
    pub alphavantage_api_key: Option<String>,
    pub fmp_api_key: Option<String>,
    /// `outputsize=full` is a premium Alpha Vantage feature; off by default.
    pub alphavantage_full_history: bool,
    /// Extra calendar days requested to cover weekends and trading halts.
    pub padding_days: u32,
    pub finmind_requests_per_minute: u32,
    pub alphavantage_requests_per_minute: u32,
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            finmind_token: None,
            alphavantage_api_key: None,
            fmp_api_key: None,
            alphavantage_full_history: false,
            padding_days: 30,
            finmind_requests_per_minute: 30,
            alphavantage_requests_per_minute: 5,
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            finmind_token: env_secret("FINMIND_API_TOKEN"),
            alphavantage_api_key: env_secret("ALPHAVANTAGE_API_KEY"),
            fmp_api_key: env_secret("FMP_API_KEY"),
            alphavantage_full_history: env_or(
                "ALPHAVANTAGE_FULL_HISTORY",
                defaults.alphavantage_full_history,
            ),
            padding_days: env_or("TA_PADDING_DAYS", defaults.padding_days),
            finmind_requests_per_minute: env_or(
                "FINMIND_REQUESTS_PER_MINUTE",
                defaults.finmind_requests_per_minute,
            ),
            alphavantage_requests_per_minute: env_or(
                "ALPHAVANTAGE_REQUESTS_PER_MINUTE",
                defaults.alphavantage_requests_per_minute,
            ),
            request_timeout: Duration::from_secs(env_or("PROVIDER_TIMEOUT_SECS", 20)),
        }
    }
}

/// Configuration for the LLM behind the sentiment source
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.2,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let provider = std::env::var("LLM_PROVIDER")
            .map(|p| p.trim().to_lowercase())
            .unwrap_or(defaults.provider);

        let (api_key, default_model) = match provider.as_str() {
            "openai" => (env_secret("OPENAI_API_KEY"), "gpt-4o-mini".to_string()),
            _ => (env_secret("GOOGLE_API_KEY"), defaults.model),
        };

        Self {
            provider,
            api_key,
            model: std::env::var("LLM_MODEL").unwrap_or(default_model),
            temperature: env_or("LLM_TEMPERATURE", defaults.temperature),
            max_attempts: env_or("LLM_MAX_ATTEMPTS", defaults.max_attempts),
            initial_backoff: Duration::from_millis(env_or("LLM_BACKOFF_MS", 500)),
            request_timeout: Duration::from_secs(env_or("LLM_TIMEOUT_SECS", 60)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            addr: env_or("SERVER_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000))),
        }
    }
}
