use std::{fmt::Debug, path::PathBuf};

use url::Url;

/// Everything the ask workflow needs, resolved from the configuration file.
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub completion: CompletionConfig,

    pub documents: DocumentsConfig,

    pub chat_log: ChatLogConfig,
}

#[derive(Clone)]
pub struct CompletionConfig {
    pub api_endpoint: Url,

    pub api_key: String,

    pub model: String,

    pub max_tokens: u32,

    pub temperature: f32,

    pub fallback_answer: String,
}

impl Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_endpoint", &self.api_endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("fallback_answer", &self.fallback_answer)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct DocumentsConfig {
    pub resume_path: PathBuf,

    pub background_path: PathBuf,

    /// Prompt with `{resume}` and `{background}` placeholders.
    pub system_prompt_template: String,
}

#[derive(Clone, Debug)]
pub struct ChatLogConfig {
    pub directory: PathBuf,
}
