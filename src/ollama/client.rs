use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::TextModel;
use super::reply::extract_reply;
use super::types::{
    ApiError, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, Message,
    ModelOptions,
};
use crate::config::OllamaSettings;
use crate::error::ServiceError;
use crate::retrieval::QueryEncoder;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("invalid Ollama base URL '{0}': must be HTTP(S)")]
    InvalidEndpoint(String),

    #[error("Ollama is overloaded (429). Please retry later.")]
    RateLimited,

    #[error("Ollama API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Ollama returned an empty {0}")]
    EmptyResponse(&'static str),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Client for a local or remote Ollama server: chat completions for the
/// grader, generator and rewriter, embeddings for the query encoder.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    chat_model: String,
    embed_model: String,
    temperature: Option<f32>,
    max_retries: u32,
    initial_backoff: Duration,
}

impl OllamaClient {
    pub fn new(http: Client, settings: &OllamaSettings) -> Result<Self, OllamaError> {
        let base_url = validate_base_url(&settings.base_url)?;
        Ok(Self {
            http,
            base_url,
            chat_model: settings.chat_model.clone(),
            embed_model: settings.embed_model.clone(),
            temperature: settings.temperature,
            max_retries: MAX_RETRIES,
            initial_backoff: INITIAL_BACKOFF,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_model: "test-chat".to_string(),
            embed_model: "test-embed".to_string(),
            temperature: None,
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(10),
        }
    }

    pub async fn chat(&self, prompt: &str) -> Result<String, OllamaError> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            options: self.temperature.map(|temperature| ModelOptions { temperature }),
        };

        let response: ChatResponse = self
            .with_retries(|| self.post_json("/api/chat", &request))
            .await?;
        if let Some(message) = response.error.as_deref() {
            warn!(error = %message, "Ollama chat error in 200 response");
            return Err(OllamaError::Api {
                code: 200,
                message: message.to_string(),
            });
        }

        debug!(model = %self.chat_model, "ollama chat complete");
        extract_reply(&response).ok_or(OllamaError::EmptyResponse("chat message"))
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, OllamaError> {
        let request = EmbeddingRequest {
            model: &self.embed_model,
            prompt: text,
        };

        let response: EmbeddingResponse = self
            .with_retries(|| self.post_json("/api/embeddings", &request))
            .await?;
        if let Some(message) = response.error {
            return Err(OllamaError::Api { code: 200, message });
        }
        if response.embedding.is_empty() {
            return Err(OllamaError::EmptyResponse("embedding"));
        }

        debug!(model = %self.embed_model, dim = response.embedding.len(), "ollama embedding complete");
        Ok(response.embedding)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, OllamaError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("User-Agent", crate::USER_AGENT)
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let classified = classify_status(status, &text);
        warn!(error = %classified, "Ollama API error");
        Err(classified)
    }

    async fn with_retries<T, F, Fut>(&self, mut op: F) -> Result<T, OllamaError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OllamaError>>,
    {
        let mut last_err = None;
        for attempt in 0..self.max_retries {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < self.max_retries {
                        let delay = jittered_backoff(self.initial_backoff, attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "retrying after transient error"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(OllamaError::RateLimited))
    }
}

impl TextModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, OllamaError> {
        self.chat(prompt).await
    }
}

impl QueryEncoder for OllamaClient {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        Ok(self.embed(text).await?)
    }
}

fn validate_base_url(raw: &str) -> Result<String, OllamaError> {
    let parsed =
        url::Url::parse(raw.trim()).map_err(|_| OllamaError::InvalidEndpoint(raw.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.as_str().trim_end_matches('/').to_string()),
        _ => Err(OllamaError::InvalidEndpoint(raw.to_string())),
    }
}

fn is_retriable(e: &OllamaError) -> bool {
    matches!(
        e,
        OllamaError::RateLimited
            | OllamaError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(initial: Duration, attempt: u32) -> Duration {
    let base = initial.as_millis() as u64 * 2u64.pow(attempt);
    let half = base / 2;
    Duration::from_millis(half + fastrand::u64(..half.max(1)))
}

fn classify_status(status: StatusCode, body: &str) -> OllamaError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return OllamaError::RateLimited;
    }
    let message = serde_json::from_str::<ApiError>(body)
        .ok()
        .and_then(|e| e.error)
        .unwrap_or_else(|| {
            let end = body.floor_char_boundary(200);
            format!("HTTP {status}: {}", &body[..end])
        });
    OllamaError::Api {
        code: status.as_u16(),
        message,
    }
}
