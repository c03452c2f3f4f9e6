use crate::config::ProviderConfig;
use crate::external::price_provider::{
    normalize_series, parse_date, ExternalPricePoint, PriceProvider, PriceProviderError,
};
use crate::services::rate_limiter::RequestPacer;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

const PROVIDER: &str = "Alpha Vantage";
const ALPHAVANTAGE_URL: &str = "https://www.alphavantage.co/query";

pub struct AlphaVantageProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    full_history: bool,
    pacer: RequestPacer,
}

impl AlphaVantageProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            api_key: config.alphavantage_api_key.clone(),
            full_history: config.alphavantage_full_history,
            pacer: RequestPacer::per_minute(config.alphavantage_requests_per_minute),
        }
    }
}

/// `compact` returns the latest 100 bars, enough for the indicator window.
/// `full` is only requested when enabled and the lookback needs it.
fn output_size(days: u32, full_history: bool) -> &'static str {
    if full_history && days > 100 {
        "full"
    } else {
        "compact"
    }
}

#[derive(Debug, Deserialize)]
struct AvDailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<BTreeMap<String, AvDailyBar>>,

    // Throttled: { "Note": "Thank you for using Alpha Vantage! ... 5 calls per minute ..." }
    #[serde(rename = "Note")]
    note: Option<String>,

    // Newer throttle / premium-endpoint wording
    #[serde(rename = "Information")]
    information: Option<String>,

    // Unknown symbol: { "Error Message": "Invalid API call. ..." }
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvDailyBar {
    #[serde(rename = "4. close")]
    close: String,
}

fn series_from_response(
    symbol: &str,
    body: AvDailyResponse,
) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
    if body.note.is_some() {
        return Err(PriceProviderError::RateLimited(PROVIDER));
    }

    if let Some(info) = body.information {
        if info.to_lowercase().contains("rate limit") {
            return Err(PriceProviderError::RateLimited(PROVIDER));
        }
        return Err(PriceProviderError::BadResponse {
            provider: PROVIDER,
            message: info,
        });
    }

    if let Some(msg) = body.error_message {
        return Err(PriceProviderError::BadResponse {
            provider: PROVIDER,
            message: msg,
        });
    }

    let series = body.time_series.ok_or_else(|| PriceProviderError::BadResponse {
        provider: PROVIDER,
        message: "missing Time Series (Daily)".into(),
    })?;

    let points = series
        .into_iter()
        .map(|(date_str, bar)| {
            let date = parse_date(PROVIDER, &date_str)?;
            let close = bar.close.parse::<f64>().map_err(|e| PriceProviderError::Parse {
                provider: PROVIDER,
                message: format!("close '{}': {}", bar.close, e),
            })?;
            Ok(ExternalPricePoint { date, close })
        })
        .collect::<Result<Vec<_>, PriceProviderError>>()?;

    let points = normalize_series(points);
    if points.is_empty() {
        return Err(PriceProviderError::NoData {
            provider: PROVIDER,
            symbol: symbol.to_string(),
        });
    }
    Ok(points)
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_daily_history(
        &self,
        ticker: &str,
        days: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(PriceProviderError::MissingCredentials("ALPHAVANTAGE_API_KEY"))?;

        let outputsize = output_size(days, self.full_history);

        self.pacer.wait_turn().await;

        let resp = self
            .client
            .get(ALPHAVANTAGE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", ticker),
                ("outputsize", outputsize),
                ("apikey", api_key),
            ])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(PriceProviderError::BadResponse {
                provider: PROVIDER,
                message: format!("HTTP {}", resp.status()),
            });
        }

        let body = resp
            .json::<AvDailyResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        series_from_response(ticker, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let body: AvDailyResponse = serde_json::from_str(json).unwrap();
        series_from_response("TSLA", body)
    }

    #[test]
    fn test_default_lookback_uses_compact_output() {
        assert_eq!(output_size(120, false), "compact");
        assert_eq!(output_size(3650, false), "compact");
        assert_eq!(output_size(60, true), "compact");
        assert_eq!(output_size(120, true), "full");
    }

    #[test]
    fn test_parses_time_series_ascending() {
        let json = r#"{
            "Meta Data": {"2. Symbol": "TSLA"},
            "Time Series (Daily)": {
                "2024-05-03": {"1. open": "1", "4. close": "181.19"},
                "2024-05-01": {"1. open": "1", "4. close": "179.99"},
                "2024-05-02": {"1. open": "1", "4. close": "180.01"}
            }
        }"#;

        let points = parse(json).unwrap();
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![179.99, 180.01, 181.19]);
    }

    #[test]
    fn test_note_means_rate_limited() {
        let err = parse(r#"{"Note": "Thank you for using Alpha Vantage! 5 calls per minute"}"#)
            .unwrap_err();
        assert!(matches!(err, PriceProviderError::RateLimited(_)));
    }

    #[test]
    fn test_error_message_is_bad_response() {
        let err = parse(r#"{"Error Message": "Invalid API call."}"#).unwrap_err();
        assert!(matches!(err, PriceProviderError::BadResponse { .. }));
        assert!(err.to_string().contains("Invalid API call."));
    }

    #[test]
    fn test_missing_series_is_bad_response() {
        let err = parse("{}").unwrap_err();
        assert!(err.to_string().contains("missing Time Series"));
    }

    #[test]
    fn test_unparseable_close_fails() {
        let json = r#"{"Time Series (Daily)": {"2024-05-01": {"4. close": "n/a"}}}"#;
        assert!(matches!(parse(json), Err(PriceProviderError::Parse { .. })));
    }
}
