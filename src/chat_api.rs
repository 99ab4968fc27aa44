use crate::error::ChatError;
use crate::prompt::PromptProfile;
use anyhow::{Context, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub host: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            host: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_seconds: 120,
        }
    }
}

impl ChatConfig {
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatCompletionsRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatCompletionsRequest {
    pub fn new(model: &str, profile: PromptProfile, source_text: &str, question: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: profile.build_messages(source_text, question),
            temperature: profile.temperature(),
            max_tokens: profile.max_output_tokens(),
        }
    }
}

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Unable to build the HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub async fn ask(
        &self,
        profile: PromptProfile,
        source_text: &str,
        question: &str,
    ) -> Result<String, ChatError> {
        let req = ChatCompletionsRequest::new(&self.config.model, profile, source_text, question);
        self.complete(&req).await
    }

    pub async fn complete(&self, req: &ChatCompletionsRequest) -> Result<String, ChatError> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(ChatError::MissingCredential),
        };

        let started = Instant::now();
        debug!(
            model = %req.model,
            temperature = req.temperature,
            max_tokens = req.max_tokens,
            "sending chat completion request"
        );

        let resp = self
            .client
            .post(self.url(COMPLETIONS_PATH))
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .json(req)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "chat completion transport failure");
                ChatError::Network(err.to_string())
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| ChatError::Network(err.to_string()))?;

        if !status.is_success() {
            let err = ChatError::from_status(status, &body);
            warn!(%status, error = %err, "chat completion rejected");
            return Err(err);
        }

        let text = parse_completion(&body)?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_len = text.len(),
            "chat completion received"
        );
        Ok(text)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.host.trim_end_matches('/'), path)
    }
}

#[derive(Deserialize, Debug)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize, Debug)]
struct AssistantMessage {
    content: Option<String>,
}

pub fn parse_completion(body: &str) -> Result<String, ChatError> {
    let parsed: ChatCompletionsResponse =
        serde_json::from_str(body).map_err(|_| ChatError::InvalidResponse)?;

    let choice = parsed.choices.into_iter().next().ok_or(ChatError::InvalidResponse)?;

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ChatError::EmptyResponse),
    }
}
