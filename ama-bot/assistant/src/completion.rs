use ama_bot_core::config::CompletionConfig;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use url::Url;

use crate::error::{self, Result};

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for an OpenAI-compatible chat completions API.
#[derive(Clone, Debug)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: Url,
    config: CompletionConfig,
}

impl CompletionClient {
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be derived or the HTTP client
    /// cannot be built.
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let mut base = config.api_endpoint.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint =
            base.join(CHAT_COMPLETIONS_PATH).context(error::BuildCompletionEndpointSnafu)?;
        let http = reqwest::Client::builder().build().context(error::BuildHttpClientSnafu)?;
        Ok(Self { http, endpoint, config })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url { &self.endpoint }

    /// Asks `question` under `system_prompt` and returns the first choice.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-2xx responses and
    /// responses without any content.
    #[tracing::instrument(skip_all, fields(model = %self.config.model))]
    pub async fn complete(&self, system_prompt: &str, question: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: question },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context(error::CompletionRequestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map_or(body, |response| response.error.message);
            return error::CompletionRejectedSnafu { status: status.as_u16(), detail }.fail();
        }

        let response: ChatResponse = response.json().await.context(error::CompletionRequestSnafu)?;
        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .context(error::EmptyCompletionSnafu)?;

        tracing::debug!(characters = answer.len(), "Received completion");
        Ok(answer)
    }
}
