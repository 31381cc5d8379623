//! Generative collaborator client (OpenAI-compatible chat completions)
//!
//! The reranker treats this service as advisory: it may time out, error, or
//! return free text that is not the requested JSON. Callers own the fallback.

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::errors::StyleRankError;

/// Chat message for the completions API
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM client with bounded sampling parameters and a request timeout
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LlmService {
    /// Create a new LLM service from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.llm.timeout_secs))
            .pool_max_idle_per_host(20)
            .build()
            .map_err(|e| StyleRankError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.llm_endpoint().to_string(),
            api_key: config.llm_key().to_string(),
            model: config.llm_model().to_string(),
        })
    }

    /// Generate a completion for a single prompt with explicit sampling
    /// parameters. Returns the raw assistant text.
    ///
    /// # Errors
    /// - Network errors and timeouts
    /// - Non-success API status codes
    /// - Responses without a completion choice
    pub async fn generate_with_params(
        &self,
        prompt: &str,
        temperature: f32,
        top_p: f32,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<&'a ChatMessage>,
            temperature: f32,
            top_p: f32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            content: Option<String>,
        }

        let message = ChatMessage::user(prompt);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![&message],
            temperature,
            top_p,
        };

        let url = format!("{}/chat/completions", self.endpoint);
        debug!(
            "Calling chat completions API: {} (model={}, temperature={})",
            url, self.model, temperature
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| StyleRankError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StyleRankError::Llm(format!(
                "Chat API error ({status}): {error_text}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| StyleRankError::Llm(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| StyleRankError::Llm("No completion in response".to_string()))
    }

    /// Model name this service is configured for
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}
