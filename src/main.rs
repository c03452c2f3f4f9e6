use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use podcast_insight::app;
use podcast_insight::config::{EnrichmentConfig, LlmConfig, ProviderConfig, ServerConfig};
use podcast_insight::external::alphavantage::AlphaVantageProvider;
use podcast_insight::external::finmind::FinMindProvider;
use podcast_insight::external::fmp::FmpProvider;
use podcast_insight::external::market_router::MarketRouter;
use podcast_insight::logging::{init_logging, LoggingConfig};
use podcast_insight::services::enrichment_service::EnrichmentService;
use podcast_insight::services::llm_service::build_provider;
use podcast_insight::services::sentiment_service::LlmSentimentSource;
use podcast_insight::services::technical_analysis_service::TechnicalAnalysisService;
use podcast_insight::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    let logging = LoggingConfig::from_env().context("invalid logging configuration")?;
    init_logging(&logging).context("failed to initialize logging")?;

    let enrichment_config = EnrichmentConfig::from_env();
    let provider_config = ProviderConfig::from_env();
    let llm_config = LlmConfig::from_env();
    let server_config = ServerConfig::from_env();

    let client = reqwest::Client::builder()
        .timeout(provider_config.request_timeout)
        .build()
        .context("failed to build HTTP client for price providers")?;

    let taiwan = Box::new(FinMindProvider::new(client.clone(), &provider_config));
    let us_primary = Box::new(AlphaVantageProvider::new(client.clone(), &provider_config));
    let mut router = MarketRouter::new(taiwan, us_primary);
    if provider_config.fmp_api_key.is_some() {
        tracing::info!("📊 US prices: Alpha Vantage with FMP fallback");
        router = router.with_us_fallback(Box::new(FmpProvider::new(client, &provider_config)));
    } else {
        tracing::info!("📊 US prices: Alpha Vantage only (FMP_API_KEY not set)");
    }

    let llm = build_provider(&llm_config).context("failed to build LLM provider")?;
    let sentiment = Arc::new(LlmSentimentSource::new(
        llm,
        enrichment_config.failure_marker.clone(),
    ));

    let technicals = Arc::new(TechnicalAnalysisService::new(
        Arc::new(router),
        enrichment_config.indicators,
    ));

    tracing::info!(
        lookback_days = enrichment_config.lookback_days,
        sma_period = enrichment_config.indicators.sma_period,
        rsi_period = enrichment_config.indicators.rsi_period,
        "Enrichment pipeline configured"
    );

    let state = AppState {
        enrichment: Arc::new(EnrichmentService::new(
            sentiment,
            technicals,
            enrichment_config,
        )),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&server_config.addr)
        .await
        .with_context(|| format!("failed to bind {}", server_config.addr))?;
    tracing::info!("🚀 Podcast insight backend running at http://{}/", server_config.addr);
    axum::serve(listener, app).await?;

    Ok(())
}
