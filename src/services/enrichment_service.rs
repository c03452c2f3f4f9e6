use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{EnrichmentConfig, MAX_LOOKBACK_DAYS};
use crate::errors::AppError;
use crate::models::{EnrichmentReport, IndicatorSummary, Market, OpinionDocument, TechnicalsMap};
use crate::services::narrative_service::render_narrative;
use crate::services::sentiment_service::SentimentSource;
use crate::services::symbol_classifier::{classify, extract_candidates, Classification};
use crate::services::technical_analysis_service::TechnicalAnalysisService;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CandidateTally {
    taiwan: usize,
    us: usize,
    skipped: usize,
}

impl CandidateTally {
    fn status_message(&self) -> String {
        format!(
            "Technical analysis finished: {} Taiwan symbol(s), {} US symbol(s), {} candidate(s) skipped.",
            self.taiwan, self.us, self.skipped
        )
    }
}

/// Runs sentiment extraction, then technicals for every symbol it can place.
///
/// Every request resolves to a report; per-symbol failures are recorded in
/// the technicals map rather than returned as errors.
pub struct EnrichmentService {
    sentiment: Arc<dyn SentimentSource>,
    technicals: Arc<TechnicalAnalysisService>,
    config: EnrichmentConfig,
}

impl EnrichmentService {
    pub fn new(
        sentiment: Arc<dyn SentimentSource>,
        technicals: Arc<TechnicalAnalysisService>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            sentiment,
            technicals,
            config,
        }
    }

    /// Sentiment extraction only, no market data lookups.
    pub async fn analyze_text(&self, text: &str) -> OpinionDocument {
        self.sentiment.analyze(text).await
    }

    /// Free-form bullet summary, no structured extraction.
    pub async fn summarize_text(&self, text: &str) -> String {
        self.sentiment.summarize(text).await
    }

    /// Technicals for a single symbol, validated against the requested market.
    ///
    /// `days` defaults to the configured lookback window.
    pub async fn analyze_symbol(
        &self,
        raw_symbol: &str,
        market: Market,
        days: Option<u32>,
    ) -> Result<IndicatorSummary, AppError> {
        let classification = classify(raw_symbol);
        let Some(symbol) = classification.symbol() else {
            return Err(AppError::Validation(format!(
                "'{}' is not a recognized TW or US symbol",
                raw_symbol.trim()
            )));
        };
        if classification.market() != Some(market) {
            return Err(AppError::Validation(format!(
                "Symbol {} does not belong to market {}",
                symbol, market
            )));
        }

        let days = days.unwrap_or(self.config.lookback_days);
        if days == 0 || days > MAX_LOOKBACK_DAYS {
            return Err(AppError::Validation(format!(
                "days must be between 1 and {}",
                MAX_LOOKBACK_DAYS
            )));
        }

        Ok(self.technicals.analyze(symbol, market, days).await)
    }

    pub async fn analyze_with_technicals(&self, text: &str) -> EnrichmentReport {
        let analysis = self.sentiment.analyze(text).await;

        if analysis.summary_starts_with(&self.config.failure_marker) {
            warn!("Sentiment extraction failed, skipping technical analysis");
            let technicals = TechnicalsMap::new();
            let final_answer = render_narrative(&analysis, &technicals);
            return EnrichmentReport {
                message: format!(
                    "Text analysis failed ({}); technical analysis was skipped.",
                    analysis.summary.as_deref().unwrap_or_default()
                ),
                analysis,
                technicals,
                final_answer,
            };
        }

        let mut technicals = TechnicalsMap::new();
        let mut tally = CandidateTally::default();

        for candidate in extract_candidates(&analysis, text) {
            let classification = classify(&candidate);
            let (Some(symbol), Some(market)) = (classification.symbol(), classification.market())
            else {
                debug!("Skipping candidate {:?}: {:?}", candidate, classification);
                tally.skipped += 1;
                continue;
            };

            match &classification {
                Classification::Taiwan(_) => tally.taiwan += 1,
                Classification::Us(_) => tally.us += 1,
                Classification::Rejected(_) => {}
            }

            let summary = self
                .technicals
                .analyze(symbol, market, self.config.lookback_days)
                .await;
            technicals.insert(symbol, summary);
        }

        info!(
            "Enrichment done: TW={}, US={}, skipped={}",
            tally.taiwan, tally.us, tally.skipped
        );

        let final_answer = render_narrative(&analysis, &technicals);
        EnrichmentReport {
            analysis,
            technicals,
            message: tally.status_message(),
            final_answer,
        }
    }
}
