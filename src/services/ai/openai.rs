use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{LlmProvider, Message};

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct OpenAiProvider {
    api_key: String,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            client,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        anyhow::ensure!(!self.api_key.is_empty(), "no completion API key configured");

        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(Message::system(system_prompt));
        conversation.extend_from_slice(messages);

        let request = CompletionRequest {
            model: &self.model,
            messages: conversation,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("chat completion request to {} failed", self.api_base))?;

        let status = resp.status();
        let text = resp.text().await.context("reading chat completion body")?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            anyhow::bail!("chat completion rejected with {status}: {detail}");
        }

        let completion: CompletionResponse =
            serde_json::from_str(&text).context("unexpected chat completion payload")?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .context("chat completion returned no choices")?;

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::debug!(model = %self.model, "guide answer truncated at max_tokens");
        }

        choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .context("chat completion returned an empty answer")
    }
}
