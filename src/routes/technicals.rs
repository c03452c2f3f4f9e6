use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{IndicatorSummary, Market};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TechnicalsQuery {
    pub days: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:market/:symbol", get(get_symbol_technicals))
}

pub async fn get_symbol_technicals(
    Path((market, symbol)): Path<(String, String)>,
    Query(query): Query<TechnicalsQuery>,
    State(state): State<AppState>,
) -> Result<Json<IndicatorSummary>, AppError> {
    info!("GET /api/ta/{}/{} - days={:?}", market, symbol, query.days);
    let market: Market = market.parse()?;

    let summary = state
        .enrichment
        .analyze_symbol(&symbol, market, query.days)
        .await
        .map_err(|e| {
            warn!("Rejected technicals lookup for {}/{}: {}", market, symbol, e);
            e
        })?;
    Ok(Json(summary))
}
