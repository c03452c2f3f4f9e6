use async_trait::async_trait;
use tracing::{info, warn};

use crate::external::price_provider::{
    ExternalPricePoint, MarketDataGateway, PriceProvider, PriceProviderError,
};
use crate::models::Market;

/// Routes each symbol to the provider for its market.
///
/// Strategy:
/// 1. TW symbols go to the Taiwan provider (FinMind)
/// 2. US symbols go to the primary US provider (Alpha Vantage)
/// 3. If the primary US provider fails and a fallback is configured (FMP), try it
pub struct MarketRouter {
    taiwan: Box<dyn PriceProvider>,
    us_primary: Box<dyn PriceProvider>,
    us_fallback: Option<Box<dyn PriceProvider>>,
}

impl MarketRouter {
    pub fn new(taiwan: Box<dyn PriceProvider>, us_primary: Box<dyn PriceProvider>) -> Self {
        Self {
            taiwan,
            us_primary,
            us_fallback: None,
        }
    }

    pub fn with_us_fallback(mut self, fallback: Box<dyn PriceProvider>) -> Self {
        self.us_fallback = Some(fallback);
        self
    }

    async fn fetch_us(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let primary_err = match self.us_primary.fetch_daily_history(symbol, days).await {
            Ok(data) => return Ok(data),
            Err(e) => e,
        };

        let Some(fallback) = &self.us_fallback else {
            return Err(primary_err);
        };

        warn!(
            "{} failed for {}: {}. Trying {}",
            self.us_primary.name(),
            symbol,
            primary_err,
            fallback.name()
        );

        match fallback.fetch_daily_history(symbol, days).await {
            Ok(data) => {
                info!("Fetched {} from fallback provider {}", symbol, fallback.name());
                Ok(data)
            }
            Err(e) => {
                warn!("{} also failed for {}: {}", fallback.name(), symbol, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl MarketDataGateway for MarketRouter {
    async fn fetch_closes(
        &self,
        symbol: &str,
        market: Market,
        lookback_days: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        match market {
            Market::Tw => self.taiwan.fetch_daily_history(symbol, lookback_days).await,
            Market::Us => self.fetch_us(symbol, lookback_days).await,
        }
    }
}
