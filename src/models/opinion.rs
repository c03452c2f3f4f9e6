use serde::{Deserialize, Serialize};

/// Normalized opinion polarity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTag {
    Bullish,
    Bearish,
    Neutral,
}

impl SentimentTag {
    /// Maps a raw tag from the extractor onto the vocabulary.
    ///
    /// Returns `None` when the tag is absent or blank. Anything present but
    /// unrecognized is treated as neutral, so the mapping never fails.
    pub fn parse(raw: Option<&str>) -> Option<SentimentTag> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
        Some(match raw.to_lowercase().as_str() {
            "bullish" => SentimentTag::Bullish,
            "bearish" => SentimentTag::Bearish,
            _ => SentimentTag::Neutral,
        })
    }

    /// Display wording used by the narrative.
    pub fn describe(raw: Option<&str>) -> &'static str {
        match Self::parse(raw) {
            Some(SentimentTag::Bullish) => "bullish",
            Some(SentimentTag::Bearish) => "bearish",
            Some(SentimentTag::Neutral) => "neutral / wait-and-see",
            None => "neutral or not clearly stated",
        }
    }
}

/// A security the commentary expressed a view on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TickerOpinion {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>, // raw tag as extracted, mapped via SentimentTag
    #[serde(default)]
    pub reason: Option<String>,
}

/// A sector or theme the commentary expressed a view on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SectorOpinion {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Structured opinion document produced by a sentiment source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpinionDocument {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tickers: Vec<TickerOpinion>,
    #[serde(default)]
    pub sectors: Vec<SectorOpinion>,
    #[serde(default)]
    pub macro_view: Vec<String>,
}

impl OpinionDocument {
    /// Document that only carries a summary, used for empty input and upstream failures.
    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Self::default()
        }
    }

    pub fn summary_starts_with(&self, marker: &str) -> bool {
        self.summary
            .as_deref()
            .is_some_and(|s| s.starts_with(marker))
    }
}
