use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::models::opinion::OpinionDocument;
use crate::models::technicals::{normalize_symbol, IndicatorSummary};

/// Symbol -> indicator summary, iterated in first-inserted order.
///
/// Keys are normalized on insert and on lookup. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TechnicalsMap {
    entries: Vec<(String, IndicatorSummary)>,
}

impl TechnicalsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a summary. Re-inserting an existing key replaces the value but
    /// keeps the original position.
    pub fn insert(&mut self, symbol: &str, summary: IndicatorSummary) {
        let key = normalize_symbol(symbol);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = summary,
            None => self.entries.push((key, summary)),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&IndicatorSummary> {
        let key = normalize_symbol(symbol);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndicatorSummary)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TechnicalsMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Sentiment document merged with per-symbol technicals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentReport {
    pub analysis: OpinionDocument,
    pub technicals: TechnicalsMap,
    pub message: String,
    pub final_answer: String,
}

/// Request body carrying raw commentary text
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeTextRequest {
    #[serde(default)]
    pub text: String,
}

/// Plain-text summary produced from commentary text
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub result: String,
}

/// Request body carrying a raw subtitle / transcript file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanTranscriptRequest {
    #[serde(default)]
    pub raw_text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanTranscriptResponse {
    pub cleaned_text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTranscriptResponse {
    pub cleaned_text: String,
    pub analysis: EnrichmentReport,
}
