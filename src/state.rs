use std::sync::Arc;

use crate::services::enrichment_service::EnrichmentService;

#[derive(Clone)]
pub struct AppState {
    pub enrichment: Arc<EnrichmentService>,
}
