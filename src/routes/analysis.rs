use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use crate::models::{
    AnalyzeTextRequest, CleanTranscriptRequest, CleanTranscriptResponse, EnrichmentReport,
    OpinionDocument, ProcessTranscriptResponse, SummaryResponse,
};
use crate::services::transcript_cleaner::clean_transcript;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze-text", post(analyze_text))
        .route("/analyze-podcast-text", post(analyze_podcast_text))
        .route("/analyze-podcast-with-ta", post(analyze_podcast_with_ta))
        .route("/clean-transcript", post(clean_transcript_text))
        .route("/process-podcast-vtt", post(process_podcast_vtt))
}

pub async fn analyze_text(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTextRequest>,
) -> Json<SummaryResponse> {
    info!("POST /api/analyze-text - {} chars", request.text.chars().count());
    Json(SummaryResponse {
        result: state.enrichment.summarize_text(&request.text).await,
    })
}

pub async fn analyze_podcast_text(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTextRequest>,
) -> Json<OpinionDocument> {
    info!("POST /api/analyze-podcast-text - {} chars", request.text.chars().count());
    Json(state.enrichment.analyze_text(&request.text).await)
}

pub async fn analyze_podcast_with_ta(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTextRequest>,
) -> Json<EnrichmentReport> {
    info!("POST /api/analyze-podcast-with-ta - {} chars", request.text.chars().count());
    Json(state.enrichment.analyze_with_technicals(&request.text).await)
}

pub async fn clean_transcript_text(
    Json(request): Json<CleanTranscriptRequest>,
) -> Json<CleanTranscriptResponse> {
    info!("POST /api/clean-transcript - {} bytes", request.raw_text.len());
    Json(CleanTranscriptResponse {
        cleaned_text: clean_transcript(&request.raw_text),
    })
}

pub async fn process_podcast_vtt(
    State(state): State<AppState>,
    Json(request): Json<CleanTranscriptRequest>,
) -> Json<ProcessTranscriptResponse> {
    info!("POST /api/process-podcast-vtt - {} bytes", request.raw_text.len());
    let cleaned_text = clean_transcript(&request.raw_text);
    let analysis = state.enrichment.analyze_with_technicals(&cleaned_text).await;
    Json(ProcessTranscriptResponse {
        cleaned_text,
        analysis,
    })
}
