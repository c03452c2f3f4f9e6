use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::Market;

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalPricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Failure reasons surfaced by price providers.
///
/// The Display text ends up in `IndicatorSummary::message`, so it is written
/// for the end user.
#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("{0} is not configured")]
    MissingCredentials(&'static str),

    #[error("{provider} API request failed: {message}")]
    Network { provider: &'static str, message: String },

    #[error("{provider} API error: {message}")]
    BadResponse { provider: &'static str, message: String },

    #[error("{provider} API response could not be parsed: {message}")]
    Parse { provider: &'static str, message: String },

    #[error("{0} API rate limit reached")]
    RateLimited(&'static str),

    #[error("{provider} returned 402: symbol {symbol} requires a paid subscription")]
    PaymentRequired { provider: &'static str, symbol: String },

    #[error("{provider} returned no closing prices for {symbol}")]
    NoData { provider: &'static str, symbol: String },
}

/// One historical price source
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Daily closes covering roughly the last `days` trading days, oldest first.
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        days: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError>;
}

/// Market-aware entry point used by the enrichment pipeline.
///
/// Implementations may over-fetch; callers trim to the lookback window.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    async fn fetch_closes(
        &self,
        symbol: &str,
        market: Market,
        lookback_days: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError>;
}

/// Sorts ascending by date and keeps one point per date (the last one seen).
/// Non-finite closes are dropped.
pub fn normalize_series(mut points: Vec<ExternalPricePoint>) -> Vec<ExternalPricePoint> {
    points.retain(|p| p.close.is_finite());
    // stable sort keeps provider order within a date, so the later duplicate wins below
    points.sort_by_key(|p| p.date);

    let mut out: Vec<ExternalPricePoint> = Vec::with_capacity(points.len());
    for point in points {
        match out.last_mut() {
            Some(prev) if prev.date == point.date => *prev = point,
            _ => out.push(point),
        }
    }
    out
}

pub(crate) fn parse_date(provider: &'static str, raw: &str) -> Result<NaiveDate, PriceProviderError> {
    // some providers append a time component
    let date_part = raw.split([' ', 'T']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| PriceProviderError::Parse {
        provider,
        message: format!("invalid date '{}': {}", raw, e),
    })
}
