use std::sync::Arc;

use tracing::{info, warn};

use crate::external::price_provider::MarketDataGateway;
use crate::models::{IndicatorSummary, Market, STATUS_OK};
use crate::services::indicators::{compute_indicators, IndicatorSettings};

/// Fetches closes for one symbol and turns them into an `IndicatorSummary`.
///
/// Every outcome, including provider failures, comes back as a summary.
pub struct TechnicalAnalysisService {
    gateway: Arc<dyn MarketDataGateway>,
    settings: IndicatorSettings,
}

impl TechnicalAnalysisService {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, settings: IndicatorSettings) -> Self {
        Self { gateway, settings }
    }

    pub async fn analyze(&self, symbol: &str, market: Market, lookback_days: u32) -> IndicatorSummary {
        let series = match self.gateway.fetch_closes(symbol, market, lookback_days).await {
            Ok(series) => series,
            Err(e) => {
                warn!("Price fetch failed for {} ({}): {}", symbol, market, e);
                return IndicatorSummary::failed(symbol, market, e.to_string());
            }
        };

        // the gateway may pad its request; the window is always trimmed here
        let Some(values) = compute_indicators(&series, lookback_days as usize, self.settings) else {
            warn!("No closing prices for {} ({})", symbol, market);
            return IndicatorSummary::failed(
                symbol,
                market,
                format!("No closing prices available for {}", symbol),
            );
        };

        info!(
            "{} ({}): close {:.2}, SMA {:.2}, RSI {:.2}",
            symbol, market, values.last_close, values.sma, values.rsi
        );

        IndicatorSummary {
            symbol: symbol.to_string(),
            market,
            start_date: Some(values.start_date),
            end_date: Some(values.end_date),
            last_close: values.last_close,
            sma: values.sma,
            rsi: values.rsi,
            above_sma: values.above_sma,
            message: STATUS_OK.to_string(),
        }
    }
}
