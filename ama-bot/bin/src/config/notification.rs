use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NotificationConfig {
    /// Receives a copy of every exchange. Unset disables notifications.
    #[serde(default)]
    pub admin_recipient: Option<String>,

    #[serde(default = "NotificationConfig::default_subject_prefix")]
    pub subject_prefix: String,
}

impl NotificationConfig {
    #[inline]
    pub fn default_subject_prefix() -> String {
        format!("{}: ", ama_bot_core::PROJECT_NAME_WITH_INITIAL_CAPITAL)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { admin_recipient: None, subject_prefix: Self::default_subject_prefix() }
    }
}
