use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::OpinionDocument;
use crate::services::llm_service::LlmProvider;

/// Turns raw commentary into a structured opinion document.
///
/// Ordinary failures never surface as errors: they are encoded in the
/// document's summary, upstream call failures with a recognizable prefix.
#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn analyze(&self, text: &str) -> OpinionDocument;

    /// Plain-text bullet summary of `text`. Failures are returned as the
    /// summary text, prefixed the same way as in `analyze`.
    async fn summarize(&self, text: &str) -> String;
}

/// Sentiment source backed by an LLM that answers with a JSON document.
pub struct LlmSentimentSource {
    provider: Option<Arc<dyn LlmProvider>>,
    failure_marker: String,
}

impl LlmSentimentSource {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, failure_marker: impl Into<String>) -> Self {
        Self {
            provider,
            failure_marker: failure_marker.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }
}

fn build_opinion_prompt(text: &str) -> String {
    format!(
        r#"You are an assistant for a financial podcast. Analyze the excerpt below and extract the speakers' views on the market, individual stocks and sectors.

Respond with JSON only: no markdown, no commentary.

The JSON structure is fixed:
{{
  "summary": "a short summary of the main points of the excerpt",
  "tickers": [
    {{
      "symbol": "ticker or exchange code, e.g. TSLA, NVDA, 2330; null if only a company name is given and the code cannot be determined",
      "name": "company or security name (may be null)",
      "sentiment": "bullish, bearish or neutral",
      "reason": "one short sentence on why the speaker holds this view"
    }}
  ],
  "sectors": [
    {{
      "name": "sector or theme, e.g. AI semiconductors, cloud, EVs",
      "sentiment": "bullish, bearish or neutral",
      "reason": "one short sentence on the speaker's view and reasoning"
    }}
  ],
  "macroView": [
    "one sentence per macro point: economy, rates, inflation, policy, liquidity"
  ]
}}

Rules:
1. Always return valid JSON.
2. Write string values in the language of the excerpt.
3. Use an empty array [] when no tickers or sectors are found.
4. macroView may also be an empty array.

Excerpt:

{}"#,
        text
    )
}

fn build_summary_prompt(text: &str) -> String {
    format!(
        "Summarize the key points of the text below as 3 to 5 bullet points, \
         in the language of the text and in no more than 300 words:\n\n{}",
        text
    )
}

/// Strips a surrounding Markdown code fence (```json ... ```) if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parses model output into a document; unparseable output becomes a summary
/// carrying the raw text so the caller can still see what came back.
fn parse_opinion_response(raw: &str) -> OpinionDocument {
    match serde_json::from_str::<OpinionDocument>(strip_code_fence(raw)) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Failed to parse opinion document: {}", e);
            OpinionDocument::with_summary(format!(
                "Could not parse the model response as JSON. Raw response:\n{}",
                raw
            ))
        }
    }
}

#[async_trait]
impl SentimentSource for LlmSentimentSource {
    async fn analyze(&self, text: &str) -> OpinionDocument {
        if text.trim().is_empty() {
            return OpinionDocument::with_summary("(no content to analyze)");
        }

        let Some(provider) = &self.provider else {
            return OpinionDocument::with_summary(
                "LLM API key is not configured; sentiment extraction is unavailable.",
            );
        };

        info!("Extracting opinions from {} chars of text", text.chars().count());

        match provider.generate_completion(build_opinion_prompt(text)).await {
            Ok(raw) if raw.trim().is_empty() => {
                OpinionDocument::with_summary("The LLM returned no text content.")
            }
            Ok(raw) => parse_opinion_response(&raw),
            Err(e) => {
                warn!("Sentiment extraction call failed: {}", e);
                OpinionDocument::with_summary(format!("{}: {}", self.failure_marker, e))
            }
        }
    }

    async fn summarize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return "(no content to summarize)".to_string();
        }

        let Some(provider) = &self.provider else {
            return "LLM API key is not configured; summarization is unavailable.".to_string();
        };

        info!("Summarizing {} chars of text", text.chars().count());

        match provider.generate_completion(build_summary_prompt(text)).await {
            Ok(raw) if raw.trim().is_empty() => "The LLM returned no text content.".to_string(),
            Ok(raw) => raw.trim().to_string(),
            Err(e) => {
                warn!("Summary call failed: {}", e);
                format!("{}: {}", self.failure_marker, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SENTIMENT_FAILURE_MARKER;
    use crate::errors::LlmError;

    struct CannedProvider(fn() -> Result<String, LlmError>);

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn generate_completion(&self, _prompt: String) -> Result<String, LlmError> {
            (self.0)()
        }
    }

    fn source(answer: fn() -> Result<String, LlmError>) -> LlmSentimentSource {
        LlmSentimentSource::new(
            Some(Arc::new(CannedProvider(answer))),
            SENTIMENT_FAILURE_MARKER,
        )
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn test_prompt_embeds_text_and_schema() {
        let prompt = build_opinion_prompt("TSMC looks strong");
        assert!(prompt.contains("TSMC looks strong"));
        assert!(prompt.contains("\"macroView\""));
        assert!(prompt.contains("\"tickers\""));
    }

    #[tokio::test]
    async fn test_parses_fenced_json_answer() {
        let src = source(|| {
            Ok("```json\n{\"summary\":\"Chips up\",\"tickers\":[{\"symbol\":\"2330\",\"sentiment\":\"bullish\"}],\"sectors\":[],\"macroView\":[]}\n```".into())
        });

        let doc = src.analyze("some text").await;
        assert_eq!(doc.summary.as_deref(), Some("Chips up"));
        assert_eq!(doc.tickers[0].symbol.as_deref(), Some("2330"));
    }

    #[tokio::test]
    async fn test_call_failure_uses_marker() {
        let src = source(|| Err(LlmError::Unavailable("overloaded".into())));

        let doc = src.analyze("some text").await;
        assert!(doc.summary_starts_with(SENTIMENT_FAILURE_MARKER));
        assert!(doc.tickers.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_answer_keeps_raw_text() {
        let src = source(|| Ok("not json at all".into()));

        let doc = src.analyze("some text").await;
        let summary = doc.summary.unwrap();
        assert!(summary.contains("not json at all"));
        assert!(!summary.starts_with(SENTIMENT_FAILURE_MARKER));
    }

    #[tokio::test]
    async fn test_blank_input_is_not_sent() {
        let src = source(|| panic!("provider must not be called"));
        let doc = src.analyze("   ").await;
        assert_eq!(doc.summary.as_deref(), Some("(no content to analyze)"));
    }

    #[tokio::test]
    async fn test_summarize_returns_trimmed_model_text() {
        let src = source(|| Ok("  - chips rally\n- rates on hold \n".into()));
        assert_eq!(src.summarize("some text").await, "- chips rally\n- rates on hold");
    }

    #[tokio::test]
    async fn test_summarize_edge_cases() {
        let failing = source(|| Err(LlmError::Timeout));
        assert!(failing
            .summarize("some text")
            .await
            .starts_with(SENTIMENT_FAILURE_MARKER));

        let empty = source(|| Ok("   ".into()));
        assert_eq!(empty.summarize("some text").await, "The LLM returned no text content.");

        let unused = source(|| panic!("provider must not be called"));
        assert_eq!(unused.summarize("  ").await, "(no content to summarize)");

        let disabled = LlmSentimentSource::new(None, SENTIMENT_FAILURE_MARKER);
        assert!(disabled.summarize("text").await.contains("not configured"));
    }

    #[test]
    fn test_summary_prompt_embeds_text() {
        assert!(build_summary_prompt("Fed holds rates").ends_with("Fed holds rates"));
    }

    #[tokio::test]
    async fn test_missing_provider_is_reported_in_summary() {
        let src = LlmSentimentSource::new(None, SENTIMENT_FAILURE_MARKER);
        assert!(!src.is_enabled());
        let doc = src.analyze("text").await;
        assert!(doc.summary.unwrap().contains("not configured"));
    }
}
