use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChatLogConfig {
    #[serde(default = "ChatLogConfig::default_directory")]
    pub directory: PathBuf,
}

impl ChatLogConfig {
    #[inline]
    pub fn default_directory() -> PathBuf { PathBuf::from(ama_bot_core::CHAT_LOG_DIRECTORY) }
}

impl Default for ChatLogConfig {
    fn default() -> Self { Self { directory: Self::default_directory() } }
}

impl From<ChatLogConfig> for ama_bot_core::config::ChatLogConfig {
    fn from(ChatLogConfig { directory }: ChatLogConfig) -> Self { Self { directory } }
}
