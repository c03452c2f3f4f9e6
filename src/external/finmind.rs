use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::external::price_provider::{
    normalize_series, parse_date, ExternalPricePoint, PriceProvider, PriceProviderError,
};
use crate::services::rate_limiter::RequestPacer;

const PROVIDER: &str = "FinMind";
const FINMIND_URL: &str = "https://api.finmindtrade.com/api/v4/data";

/// Taiwan-listed daily prices from FinMind's `TaiwanStockPrice` dataset.
pub struct FinMindProvider {
    client: reqwest::Client,
    token: Option<String>,
    padding_days: u32,
    pacer: RequestPacer,
}

impl FinMindProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            token: config.finmind_token.clone(),
            padding_days: config.padding_days,
            pacer: RequestPacer::per_minute(config.finmind_requests_per_minute),
        }
    }

    /// Calendar range to request: the lookback plus padding for holidays and halts.
    /// Saturates at the earliest representable date instead of overflowing.
    fn date_range(&self, today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
        let span = Duration::days(i64::from(days) + i64::from(self.padding_days));
        let start = today.checked_sub_signed(span).unwrap_or(NaiveDate::MIN);
        (start, today)
    }
}

#[derive(Debug, Deserialize)]
struct FinMindResponse {
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<FinMindPriceRecord>,
}

#[derive(Debug, Deserialize)]
struct FinMindPriceRecord {
    date: Option<String>,
    close: Option<f64>,
}

fn series_from_response(
    symbol: &str,
    body: FinMindResponse,
) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
    if !body.msg.eq_ignore_ascii_case("success") {
        return Err(PriceProviderError::BadResponse {
            provider: PROVIDER,
            message: body.msg,
        });
    }

    // malformed rows are skipped rather than failing the whole series
    let points: Vec<ExternalPricePoint> = body
        .data
        .into_iter()
        .filter_map(|record| {
            let date = parse_date(PROVIDER, record.date.as_deref()?).ok()?;
            Some(ExternalPricePoint {
                date,
                close: record.close?,
            })
        })
        .collect();

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
impl PriceProvider for FinMindProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_daily_history(
        &self,
        ticker: &str,
        days: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let token = self
            .token
            .as_deref()
            .ok_or(PriceProviderError::MissingCredentials("FINMIND_API_TOKEN"))?;

        let (start, end) = self.date_range(Utc::now().date_naive(), days);
        debug!("FinMind request for {} from {} to {}", ticker, start, end);

        let start_date = start.to_string();
        let end_date = end.to_string();

        self.pacer.wait_turn().await;

        let resp = self
            .client
            .get(FINMIND_URL)
            .query(&[
                ("dataset", "TaiwanStockPrice"),
                ("data_id", ticker),
                ("start_date", start_date.as_str()),
                ("end_date", end_date.as_str()),
                ("token", token),
            ])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(PriceProviderError::RateLimited(PROVIDER));
        }
        if status.as_u16() == 402 {
            warn!("FinMind quota exhausted while fetching {}", ticker);
            return Err(PriceProviderError::RateLimited(PROVIDER));
        }
        if !status.is_success() {
            return Err(PriceProviderError::BadResponse {
                provider: PROVIDER,
                message: format!("HTTP {}", status),
            });
        }

        let body = resp
            .json::<FinMindResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        series_from_response(ticker, body)
    }
}
