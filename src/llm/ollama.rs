use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::automation::collaborators::DecisionMaker;
use crate::automation::config::QuizConfig;

/// Liveness probes should fail fast.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatReplyMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

/// Blocking client for the Ollama chat API.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &QuizConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Extracts the reply text from an `/api/chat` response body.
fn parse_chat_response(body: &str) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| anyhow!("Invalid JSON from Ollama: {}", e))?;

    if let Some(err) = response.error {
        return Err(anyhow!("Ollama error: {}", err));
    }

    response
        .message
        .map(|m| m.content.trim().to_string())
        .ok_or_else(|| anyhow!("No message in Ollama response"))
}

/// Lists model names from an `/api/tags` response body.
fn parse_model_names(body: &str) -> Result<Vec<String>> {
    let tags: TagsResponse =
        serde_json::from_str(body).map_err(|e| anyhow!("Invalid JSON from Ollama: {}", e))?;
    Ok(tags.models.into_iter().map(|m| m.name).collect())
}

impl DecisionMaker for OllamaClient {
    fn probe(&self) -> Result<()> {
        crate::log("Checking Ollama connection...");

        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .map_err(|e| {
                anyhow!(
                    "Could not connect to Ollama at {}. Is it running? Error: {}",
                    self.base_url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Ollama returned HTTP {}", status));
        }

        let models = parse_model_names(&response.text()?)?;
        crate::log(&format!("Ollama is online ({} models).", models.len()));
        if !models.iter().any(|name| name == &self.model) {
            crate::log(&format!(
                "Warning: model '{}' is not listed by Ollama; it may need `ollama pull`.",
                self.model
            ));
        }
        Ok(())
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    anyhow!("Ollama unreachable or timed out: {}", e)
                } else {
                    anyhow!("Network error: {}", e)
                }
            })?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow!(
                "Ollama chat failed ({}): {}",
                status,
                if body.is_empty() { "no body" } else { body.as_str() }
            ));
        }

        parse_chat_response(&body)
    }
}
