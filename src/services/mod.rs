pub mod enrichment_service;
pub mod indicators;
pub mod llm_service;
pub mod narrative_service;
pub mod rate_limiter;
pub mod sentiment_service;
pub mod symbol_classifier;
pub mod technical_analysis_service;
pub mod transcript_cleaner;
