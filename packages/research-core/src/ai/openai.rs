//! OpenAI-compatible implementation of the language-model traits.
//!
//! Talks to any server exposing `/chat/completions` and `/embeddings`
//! (OpenAI, LM Studio, vLLM, llama.cpp, ...). One client implements
//! [`Embedder`], [`SectionWriter`] and [`Planner`].
//!
//! # Example
//!
//! ```rust,ignore
//! use research_core::ai::OpenAI;
//!
//! let ai = OpenAI::new("https://api.openai.com/v1")
//!     .with_api_key("sk-...")
//!     .with_model("gpt-4o-mini");
//! let ai = Arc::new(ai);
//! let researcher = Researcher::builder()
//!     .with_planner(ai.clone())
//!     .with_section_writer(ai.clone())
//!     .with_embedder(ai)
//!     // ...
//!     .build()?;
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ResearchError, Result};
use crate::pipeline::prompts::{
    format_planner_prompt, format_section_prompt, parse_plan, PLANNER_SYSTEM_PROMPT,
    SECTION_SYSTEM_PROMPT,
};
use crate::security::ServiceEndpoint;
use crate::traits::ai::{Embedder, Planner, SectionWriter};
use crate::types::report::{ResearchPlan, Snippet};

/// Token budget for the planner.
const PLANNER_MAX_TOKENS: u32 = 1500;

/// Token budget for one section.
const SECTION_MAX_TOKENS: u32 = 1024;

/// Per-request budget for chat and embedding calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which caller a chat failure is reported as.
#[derive(Clone, Copy)]
enum ChatPurpose {
    Planning,
    Generation,
}

impl ChatPurpose {
    fn error(self, message: String) -> ResearchError {
        match self {
            ChatPurpose::Planning => ResearchError::Planning(message.into()),
            ChatPurpose::Generation => ResearchError::Generation(message.into()),
        }
    }
}

/// OpenAI-compatible client.
///
/// Defaults to `gpt-4o-mini` for chat and `text-embedding-3-small` for
/// embeddings, temperature 0.3, and a 30s timeout per request.
#[derive(Debug, Clone)]
pub struct OpenAI {
    client: Client,
    endpoint: ServiceEndpoint,
    timeout: Duration,
    model: String,
    embedding_model: String,
    temperature: f32,
}

impl OpenAI {
    /// Create a client for the API rooted at `base_url` (e.g. `.../v1`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: ServiceEndpoint::new(base_url),
            timeout: REQUEST_TIMEOUT,
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.3,
        }
    }

    /// Set the bearer key. Local servers usually need none.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.endpoint = self.endpoint.with_api_key(key);
        self
    }

    /// Set the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.endpoint
            .authorize(self.client.post(self.endpoint.url(path)))
            .timeout(self.timeout)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Make a chat completion request.
    async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        purpose: ChatPurpose,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(self.temperature),
            max_tokens: Some(max_tokens),
        };

        let response = self
            .post("chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| purpose.error(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(purpose.error(format!("chat API error {}: {}", status, error_text)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| purpose.error(e.to_string()))?;

        first_content(chat_response).ok_or_else(|| purpose.error("empty chat response".into()))
    }

    /// Make an embedding request.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };

        let response = self
            .post("embeddings")
            .json(&request)
            .send()
            .await
            .map_err(|e| ResearchError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ResearchError::Embedding(format!(
                "embedding API error {}: {}",
                status, error_text
            )));
        }

        let embed_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Embedding(e.to_string()))?;

        embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ResearchError::Embedding("no embedding returned".into()))
    }
}

fn first_content(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

#[async_trait]
impl Embedder for OpenAI {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_text(text).await
    }
}

#[async_trait]
impl SectionWriter for OpenAI {
    async fn write_section(&self, title: &str, snippets: &[Snippet]) -> Result<String> {
        let prompt = format_section_prompt(title, snippets);
        debug!(section = %title, snippets = snippets.len(), model = %self.model, "Writing section");
        self.chat(
            SECTION_SYSTEM_PROMPT,
            &prompt,
            SECTION_MAX_TOKENS,
            ChatPurpose::Generation,
        )
        .await
    }
}

#[async_trait]
impl Planner for OpenAI {
    async fn plan(&self, question: &str) -> Result<ResearchPlan> {
        let response = self
            .chat(
                PLANNER_SYSTEM_PROMPT,
                &format_planner_prompt(question),
                PLANNER_MAX_TOKENS,
                ChatPurpose::Planning,
            )
            .await?;
        Ok(parse_plan(question, &response))
    }
}

// Request/Response types

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
