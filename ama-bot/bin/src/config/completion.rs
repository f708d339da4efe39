use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use url::Url;

use crate::config::{error, Error};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CompletionConfig {
    #[serde(default = "CompletionConfig::default_api_endpoint")]
    pub api_endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "CompletionConfig::default_model")]
    pub model: String,

    #[serde(default = "CompletionConfig::default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "CompletionConfig::default_temperature")]
    pub temperature: f32,

    #[serde(default = "CompletionConfig::default_fallback_answer")]
    pub fallback_answer: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_endpoint: Self::default_api_endpoint(),
            api_key: None,
            model: Self::default_model(),
            max_tokens: Self::default_max_tokens(),
            temperature: Self::default_temperature(),
            fallback_answer: Self::default_fallback_answer(),
        }
    }
}

impl CompletionConfig {
    #[inline]
    pub fn default_api_endpoint() -> String {
        ama_bot_core::DEFAULT_COMPLETION_ENDPOINT.to_string()
    }

    #[inline]
    pub fn default_model() -> String { ama_bot_core::DEFAULT_COMPLETION_MODEL.to_string() }

    #[inline]
    pub const fn default_max_tokens() -> u32 { ama_bot_core::DEFAULT_COMPLETION_MAX_TOKENS }

    #[inline]
    pub const fn default_temperature() -> f32 { ama_bot_core::DEFAULT_COMPLETION_TEMPERATURE }

    #[inline]
    pub fn default_fallback_answer() -> String {
        "I apologize, but I'm having trouble connecting to the AI service. Please try again \
         later."
            .to_string()
    }

    pub fn into_runtime(self) -> Result<ama_bot_core::config::CompletionConfig, Error> {
        self.into_runtime_with(std::env::var(API_KEY_ENV).ok())
    }

    fn into_runtime_with(
        self,
        from_env: Option<String>,
    ) -> Result<ama_bot_core::config::CompletionConfig, Error> {
        let Self { api_endpoint, api_key, model, max_tokens, temperature, fallback_answer } = self;
        let api_endpoint = Url::parse(&api_endpoint)
            .context(error::ParseCompletionEndpointSnafu { value: api_endpoint.clone() })?;
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| from_env.filter(|key| !key.trim().is_empty()))
            .ok_or(Error::MissingCompletionApiKey)?;

        Ok(ama_bot_core::config::CompletionConfig {
            api_endpoint,
            api_key,
            model,
            max_tokens,
            temperature,
            fallback_answer,
        })
    }
}
