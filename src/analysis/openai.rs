use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AnalysisError, AnalysisService};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";

const SYSTEM_PROMPT: &str = "You are a research assistant that analyzes academic citations.";

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct OpenAiAnalyzer {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl OpenAiAnalyzer {
    pub fn new(api_key: Option<String>, model: String, api_base: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("citation-decoder/0.1")
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            model,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

fn build_prompt(marker: &str, context: &str) -> String {
    format!(
        "Analyze the following citation in its context:\n\n\
         Citation: {marker}\n\n\
         Context:\n\"{context}\"\n\n\
         Please provide:\n\
         1. What this cited paper contributes to the current paper\n\
         2. The purpose of this citation (e.g., supporting evidence, contrasting view, background information)\n\
         3. The authors' stance towards the cited work (agree, critique, extend, or neutral)\n\n\
         Format your response as a JSON with these keys: \"contribution\", \"purpose\", \"stance\""
    )
}

#[async_trait]
impl AnalysisService for OpenAiAnalyzer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, marker: &str, context: &str) -> Result<String, AnalysisError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AnalysisError::MissingKey("OPENAI_API_KEY".to_string()))?;

        let prompt = build_prompt(marker, context);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: 0.3,
            max_tokens: 500,
        };

        let url = format!("{}/chat/completions", self.api_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::Api(format!("{}: {}", status, detail.trim())));
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(AnalysisError::EmptyResponse)
    }
}
