use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::LlmConfig;
use crate::errors::LlmError;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError>;
}

fn classify_status(status: StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        429 => LlmError::RateLimited,
        503 => LlmError::Unavailable(body),
        _ => LlmError::ApiError(format!("HTTP {}: {}", status, body)),
    }
}

fn map_transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::NetworkError(e.to_string())
    }
}

fn build_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::NetworkError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

/// Google Gemini `generateContent` provider
pub struct GeminiProvider {
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            client: build_client(config.request_timeout)?,
        })
    }
}

/// Joins the text parts of the first candidate with newlines.
fn gemini_text(response: GeminiResponse) -> Result<String, LlmError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No candidates in response".to_string()))?;

    let parts = candidate
        .content
        .map(|c| c.parts)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| LlmError::InvalidResponse("No content parts in response".to_string()))?;

    Ok(parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("\n"))
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError> {
        info!("Generating Gemini completion (model: {})", self.model);

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: Some(prompt) }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body = response
            .json::<GeminiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        gemini_text(body)
    }
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI chat completions provider
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            client: build_client(config.request_timeout)?,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError> {
        info!("Generating OpenAI completion (model: {})", self.model);

        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: "You extract market opinions from financial commentary and answer with JSON only.".to_string(),
                },
                OpenAiMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body = response
            .json::<OpenAiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &body.usage {
            info!(
                "OpenAI tokens: {} prompt + {} completion",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Retry decorator
// ---------------------------------------------------------------------------

/// Retries transient provider failures (503, 429, timeouts) with exponential backoff.
///
/// Any other error is returned immediately.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError> {
        let mut attempt = 1;
        let mut delay = self.initial_backoff;

        loop {
            match self.inner.generate_completion(prompt.clone()).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "LLM call failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!("LLM call failed after {} attempts: {}", attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Builds the configured provider wrapped in the retry decorator.
///
/// Returns `None` when no API key is configured; the sentiment source then
/// reports that in the document summary instead of calling out.
pub fn build_provider(config: &LlmConfig) -> Result<Option<Arc<dyn LlmProvider>>, LlmError> {
    let Some(api_key) = config.api_key.clone() else {
        warn!("LLM API key not configured. Sentiment extraction disabled.");
        return Ok(None);
    };

    let inner: Arc<dyn LlmProvider> = match config.provider.as_str() {
        "openai" => Arc::new(OpenAiProvider::new(api_key, config)?),
        "gemini" => Arc::new(GeminiProvider::new(api_key, config)?),
        other => {
            warn!("Unknown LLM provider: {}. Sentiment extraction disabled.", other);
            return Ok(None);
        }
    };

    info!("Initializing LLM provider: {} ({})", config.provider, config.model);
    Ok(Some(Arc::new(RetryingProvider::new(
        inner,
        config.max_attempts,
        config.initial_backoff,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate_completion(&self, _prompt: String) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::ApiError("script exhausted".into())))
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let inner = ScriptedProvider::new(vec![
            Err(LlmError::Unavailable("overloaded".into())),
            Err(LlmError::Timeout),
            Ok("{}".into()),
        ]);
        let retrying = RetryingProvider::new(inner.clone(), 3, Duration::from_millis(1));

        let result = retrying.generate_completion("p".into()).await;
        assert_eq!(result.unwrap(), "{}");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = ScriptedProvider::new(vec![
            Err(LlmError::Unavailable("a".into())),
            Err(LlmError::Unavailable("b".into())),
            Err(LlmError::Unavailable("c".into())),
            Ok("never reached".into()),
        ]);
        let retrying = RetryingProvider::new(inner.clone(), 3, Duration::from_millis(1));

        let result = retrying.generate_completion("p".into()).await;
        assert!(matches!(result, Err(LlmError::Unavailable(_))));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let inner = ScriptedProvider::new(vec![Err(LlmError::ApiError("HTTP 400".into()))]);
        let retrying = RetryingProvider::new(inner.clone(), 5, Duration::from_millis(1));

        assert!(retrying.generate_completion("p".into()).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, "busy".into()),
            LlmError::Unavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimited
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, String::new()),
            LlmError::ApiError(_)
        ));
    }

    #[test]
    fn test_gemini_text_joins_parts() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(gemini_text(response).unwrap(), "a\nb");
    }

    #[test]
    fn test_gemini_text_requires_candidates() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(gemini_text(response), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_missing_key_disables_provider() {
        let config = LlmConfig::default();
        assert!(build_provider(&config).unwrap().is_none());
    }
}
