mod enrichment;
mod opinion;
mod technicals;

pub use enrichment::{
    AnalyzeTextRequest, CleanTranscriptRequest, CleanTranscriptResponse, EnrichmentReport,
    ProcessTranscriptResponse, SummaryResponse, TechnicalsMap,
};
pub use opinion::{OpinionDocument, SectorOpinion, SentimentTag, TickerOpinion};
pub use technicals::{normalize_symbol, IndicatorSummary, Market, STATUS_OK};
