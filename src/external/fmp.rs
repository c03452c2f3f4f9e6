use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::external::price_provider::{
    normalize_series, parse_date, ExternalPricePoint, PriceProvider, PriceProviderError,
};

const PROVIDER: &str = "FMP";
const FMP_EOD_URL: &str = "https://financialmodelingprep.com/stable/historical-price-eod/full";

/// Financial Modeling Prep end-of-day prices, used as the US fallback.
pub struct FmpProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    padding_days: u32,
}

impl FmpProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            api_key: config.fmp_api_key.clone(),
            padding_days: config.padding_days,
        }
    }

    /// Number of daily bars to ask for, lookback plus padding.
    fn requested_points(&self, days: u32) -> u32 {
        days.saturating_add(self.padding_days)
    }
}

#[derive(Debug, Deserialize)]
struct FmpBar {
    date: String,
    close: Option<f64>,
}

/// The stable endpoint answers with a bare array; the legacy one wraps it in `historical`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FmpResponse {
    Bars(Vec<FmpBar>),
    Wrapped {
        #[serde(default)]
        historical: Vec<FmpBar>,
        #[serde(rename = "Error Message")]
        error_message: Option<String>,
    },
}

fn series_from_response(
    symbol: &str,
    body: FmpResponse,
) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
    let bars = match body {
        FmpResponse::Bars(bars) => bars,
        FmpResponse::Wrapped {
            error_message: Some(msg),
            ..
        } => {
            return Err(PriceProviderError::BadResponse {
                provider: PROVIDER,
                message: msg,
            })
        }
        FmpResponse::Wrapped { historical, .. } => historical,
    };

    let points = bars
        .into_iter()
        .filter_map(|bar| {
            let close = bar.close?;
            let date = parse_date(PROVIDER, &bar.date).ok()?;
            Some(ExternalPricePoint { date, close })
        })
        .collect();

    // FMP lists newest first; normalize_series restores ascending order
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
impl PriceProvider for FmpProvider {
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
            .ok_or(PriceProviderError::MissingCredentials("FMP_API_KEY"))?;

        let timeseries = self.requested_points(days).to_string();
        debug!("FMP request for {} (timeseries={})", ticker, timeseries);

        let resp = self
            .client
            .get(FMP_EOD_URL)
            .query(&[
                ("symbol", ticker),
                ("timeseries", timeseries.as_str()),
                ("apikey", api_key),
            ])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        match resp.status().as_u16() {
            402 => {
                return Err(PriceProviderError::PaymentRequired {
                    provider: PROVIDER,
                    symbol: ticker.to_string(),
                })
            }
            404 => {
                return Err(PriceProviderError::NoData {
                    provider: PROVIDER,
                    symbol: ticker.to_string(),
                })
            }
            429 => return Err(PriceProviderError::RateLimited(PROVIDER)),
            code if !(200..300).contains(&code) => {
                return Err(PriceProviderError::BadResponse {
                    provider: PROVIDER,
                    message: format!("HTTP {}", code),
                })
            }
            _ => {}
        }

        let body = resp
            .json::<FmpResponse>()
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
        let body: FmpResponse = serde_json::from_str(json).unwrap();
        series_from_response("AAPL", body)
    }

    #[test]
    fn test_parses_bare_array_newest_first() {
        let json = r#"[
            {"symbol": "AAPL", "date": "2024-05-03", "close": 183.38},
            {"symbol": "AAPL", "date": "2024-05-02", "close": 173.03}
        ]"#;

        let points = parse(json).unwrap();
        assert_eq!(points[0].close, 173.03);
        assert_eq!(points[1].close, 183.38);
    }

    #[test]
    fn test_parses_legacy_wrapper() {
        let json = r#"{"symbol": "AAPL", "historical": [{"date": "2024-05-02", "close": 173.03}]}"#;
        assert_eq!(parse(json).unwrap().len(), 1);
    }

    #[test]
    fn test_error_message_is_bad_response() {
        let json = r#"{"Error Message": "Invalid API KEY."}"#;
        let err = parse(json).unwrap_err();
        assert!(err.to_string().contains("Invalid API KEY."));
    }

    #[test]
    fn test_requested_points_saturates() {
        let provider = FmpProvider::new(reqwest::Client::new(), &ProviderConfig::default());
        assert_eq!(provider.requested_points(120), 150);
        assert_eq!(provider.requested_points(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_empty_is_no_data() {
        assert!(matches!(parse("[]"), Err(PriceProviderError::NoData { .. })));
    }
}
