//! OpenAI-compatible generator
//!
//! Implements ExternalGenerator by calling `POST {base_url}/chat/completions`
//! on any OpenAI-compatible endpoint (OpenAI, Ollama, vLLM, LM Studio, etc.).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::OpenAiSettings;
use crate::content::ContentProvider;

use super::limiter::RateLimiter;
use super::{ContextLine, ExternalGenerator, GenerationError};

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Generator
// ─────────────────────────────────────────────────────────────────

/// Rate-limited OpenAI-compatible chat completion client
pub struct OpenAiGenerator {
    settings: OpenAiSettings,
    client: Client,
    limiter: RateLimiter,
    content: Arc<dyn ContentProvider>,
}

impl OpenAiGenerator {
    pub fn new(
        settings: OpenAiSettings,
        limiter: RateLimiter,
        content: Arc<dyn ContentProvider>,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %settings.base_url,
            timeout_secs = settings.timeout_secs,
            "OpenAI-compatible generator created"
        );

        Ok(Self {
            settings,
            client,
            limiter,
            content,
        })
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.settings.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.settings.api_key))
        }
    }

    fn build_request(&self, persona: &str, context: &[ContextLine]) -> ChatCompletionRequest {
        let profile = self.content.profile(persona);

        let mut messages = Vec::with_capacity(context.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            name: None,
            content: profile.system_prompt.clone(),
        });
        messages.extend(context.iter().map(|line| ChatMessage {
            role: "assistant",
            name: Some(author_name(&line.speaker)),
            content: line.text.clone(),
        }));

        ChatCompletionRequest {
            model: profile.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    /// Make a chat completion request with retry logic.
    ///
    /// The rate-limit wait before each attempt is not part of the transport
    /// timeout, which bounds a single HTTP attempt.
    async fn chat_completion(&self, request: &ChatCompletionRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));

        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(4),
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            // Every attempt reaches the provider, so every attempt takes a slot
            self.limiter.acquire().await;

            match self.send_with_timeout(&url, request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
                    warn!(attempt, ?delay, error = %e, "Retryable generation error");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_with_timeout(
        &self,
        url: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, GenerationError> {
        let secs = self.settings.timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), self.send_once(url, request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout { secs }),
        }
    }

    async fn send_once(&self, url: &str, request: &ChatCompletionRequest) -> Result<String, GenerationError> {
        let mut req = self.client.post(url).json(request);
        if let Some(ref auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout {
                    secs: self.settings.timeout_secs,
                }
            } else {
                GenerationError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl ExternalGenerator for OpenAiGenerator {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, persona: &str, context: &[ContextLine]) -> Result<String, GenerationError> {
        let request = self.build_request(persona, context);
        debug!(persona, model = %request.model, context = context.len(), "Requesting completion");

        self.chat_completion(&request).await
    }
}

/// Author name accepted by the chat API: lowercase, spaces to underscores,
/// anything outside `[a-z0-9_-]` dropped.
fn author_name(speaker: &str) -> String {
    speaker
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use crate::content::ContentCatalog;

    fn generator(settings: OpenAiSettings) -> OpenAiGenerator {
        generator_with_limiter(settings, RateLimiter::new(3, Duration::from_secs(60)))
    }

    fn generator_with_limiter(settings: OpenAiSettings, limiter: RateLimiter) -> OpenAiGenerator {
        OpenAiGenerator::new(
            settings,
            limiter,
            Arc::new(ContentCatalog::bundled().unwrap()),
        )
        .unwrap()
    }

    /// Local chat completion endpoint that fails the first `failures`
    /// requests with 503 and answers the rest. Returns the base URL and the
    /// request counter.
    async fn stub_provider(failures: usize) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(_body): Json<Value>| {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < failures {
                        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "overloaded" })))
                    } else {
                        (
                            StatusCode::OK,
                            Json(json!({
                                "choices": [{ "message": { "content": "  The walls hum.  " } }]
                            })),
                        )
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (format!("http://{}/v1", addr), hits)
    }

    fn stub_settings(base_url: String) -> OpenAiSettings {
        OpenAiSettings {
            base_url,
            api_key: "sk-test".to_string(),
            timeout_secs: 5,
            max_retries: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_author_name() {
        assert_eq!(author_name("GPT-4 Turbo"), "gpt-4_turbo");
        assert_eq!(author_name("GPT-3.5"), "gpt-35");
        assert_eq!(author_name("System  Log"), "system_log");
    }

    #[test]
    fn test_auth_header() {
        let with_key = generator(OpenAiSettings {
            api_key: "sk-test-123".to_string(),
            ..Default::default()
        });
        assert_eq!(with_key.auth_header(), Some("Bearer sk-test-123".to_string()));

        let no_key = generator(OpenAiSettings::default());
        assert_eq!(no_key.auth_header(), None);
    }

    #[test]
    fn test_build_request_uses_profile_and_context() {
        let gen = generator(OpenAiSettings::default());
        let context = vec![
            ContextLine::new("System Log", "Memory allocation shifting to sector 7G."),
            ContextLine::new("GPT-2", "The backrooms have no EXIT statement."),
        ];

        let request = gen.build_request("GPT-4", &context);
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.max_tokens, 100);
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[0].content.contains("GPT-4"));
        assert_eq!(request.messages[1].role, "assistant");
        assert_eq!(request.messages[1].name.as_deref(), Some("system_log"));
        assert_eq!(request.messages[2].name.as_deref(), Some("gpt-2"));
    }

    #[test]
    fn test_build_request_unknown_persona_uses_default_profile() {
        let gen = generator(OpenAiSettings::default());
        let request = gen.build_request("Stranger", &[]);
        assert_eq!(request.model, "gpt-3.5-turbo");
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_request_serialization() {
        let gen = generator(OpenAiSettings::default());
        let request = gen.build_request("GPT-3.5", &[ContextLine::new("GPT-4", "Hello")]);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert!(json["messages"][0].get("name").is_none());
        assert_eq!(json["messages"][1]["name"], "gpt-4");
        assert_eq!(json["messages"][1]["content"], "Hello");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_generation_error() {
        let gen = generator(OpenAiSettings {
            // Port 9 (discard) on localhost is closed on test machines
            base_url: "http://127.0.0.1:9/v1".to_string(),
            max_retries: 0,
            timeout_secs: 5,
            ..Default::default()
        });

        let err = gen.generate("GPT-4", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Transport(_) | GenerationError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_retries_wait_for_rate_limit_slots() {
        let (base_url, hits) = stub_provider(usize::MAX).await;
        let gen = generator_with_limiter(
            stub_settings(base_url),
            RateLimiter::new(1, Duration::from_secs(60)),
        );

        // The first attempt fails with 503; the retry must wait for the window
        let outcome = tokio::time::timeout(Duration::from_secs(3), gen.generate("GPT-4", &[])).await;
        assert!(outcome.is_err(), "retry should still be waiting for a slot");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_within_rate_limit() {
        let (base_url, hits) = stub_provider(1).await;
        let gen = generator_with_limiter(
            stub_settings(base_url),
            RateLimiter::new(2, Duration::from_secs(60)),
        );

        let text = gen.generate("GPT-4", &[]).await.unwrap();
        assert_eq!(text, "The walls hum.");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(gen.limiter.available().await, 0);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_api_error() {
        let (base_url, hits) = stub_provider(usize::MAX).await;
        let gen = generator_with_limiter(
            stub_settings(base_url),
            RateLimiter::new(3, Duration::from_secs(60)),
        );

        let err = gen.generate("GPT-4", &[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Api { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
