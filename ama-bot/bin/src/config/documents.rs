use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DocumentsConfig {
    #[serde(default = "DocumentsConfig::default_resume_path")]
    pub resume_path: PathBuf,

    #[serde(default = "DocumentsConfig::default_background_path")]
    pub background_path: PathBuf,

    #[serde(default = "DocumentsConfig::default_system_prompt_template")]
    pub system_prompt_template: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            resume_path: Self::default_resume_path(),
            background_path: Self::default_background_path(),
            system_prompt_template: Self::default_system_prompt_template(),
        }
    }
}

impl DocumentsConfig {
    #[inline]
    pub fn default_resume_path() -> PathBuf { PathBuf::from("resume.txt") }

    #[inline]
    pub fn default_background_path() -> PathBuf { PathBuf::from("about_me.txt") }

    #[inline]
    pub fn default_system_prompt_template() -> String {
        ama_bot_assistant::DEFAULT_SYSTEM_PROMPT_TEMPLATE.to_string()
    }
}

impl From<DocumentsConfig> for ama_bot_core::config::DocumentsConfig {
    fn from(config: DocumentsConfig) -> Self {
        let DocumentsConfig { resume_path, background_path, system_prompt_template } = config;
        Self { resume_path, background_path, system_prompt_template }
    }
}
