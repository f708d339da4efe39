mod chat_log;
mod completion;
mod documents;
mod error;
mod gmail;
mod notification;

use std::path::{Path, PathBuf};

use ama_cli_common::config::LogConfig;
use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

pub use self::{
    chat_log::ChatLogConfig,
    completion::CompletionConfig,
    documents::DocumentsConfig,
    error::Error,
    gmail::{GmailConfig, RedirectMode},
    notification::NotificationConfig,
};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub gmail: GmailConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub documents: DocumentsConfig,

    #[serde(default)]
    pub chat_log: ChatLogConfig,

    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Config {
    /// The first existing configuration file among the project config
    /// directory and the conventional fallbacks, else the project one.
    #[inline]
    pub fn default_path() -> PathBuf {
        let primary = ama_bot_core::PROJECT_CONFIG_DIR.join(ama_bot_core::CONFIG_NAME);
        std::iter::once(primary.clone())
            .chain(
                ama_bot_core::fallback_project_config_directories()
                    .into_iter()
                    .map(|directory| directory.join(ama_bot_core::CONFIG_NAME)),
            )
            .find(|path| path.exists())
            .unwrap_or(primary)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config: Self = {
            let data = std::fs::read_to_string(&path)
                .context(error::OpenConfigSnafu { filename: path.as_ref().to_path_buf() })?;

            serde_yaml::from_str(&data)
                .context(error::ParseConfigSnafu { filename: path.as_ref().to_path_buf() })?
        };

        config.resolved()
    }

    /// Expands `~` and relative paths in every path-valued setting.
    pub fn resolved(mut self) -> Result<Self, Error> {
        self.log.sinks.file = self.log.sinks.file.map(resolve_file_path).transpose()?;
        self.gmail.resolve_paths(resolve_file_path)?;
        self.documents.resume_path = resolve_file_path(self.documents.resume_path)?;
        self.documents.background_path = resolve_file_path(self.documents.background_path)?;
        self.chat_log.directory = resolve_file_path(self.chat_log.directory)?;
        Ok(self)
    }

    /// Settings for the ask workflow.
    pub fn assistant_config(&self) -> Result<ama_bot_core::config::AssistantConfig, Error> {
        Ok(ama_bot_core::config::AssistantConfig {
            completion: self.completion.clone().into_runtime()?,
            documents: self.documents.clone().into(),
            chat_log: self.chat_log.clone().into(),
        })
    }
}

fn resolve_file_path(path: PathBuf) -> Result<PathBuf, Error> {
    path.try_resolve()
        .map(|resolved| resolved.to_path_buf())
        .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("ama-bot.yaml");
        std::fs::write(&path, "{}\n").unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.gmail.redirect_mode, RedirectMode::Loopback);
        assert_eq!(config.completion.model, "gpt-3.5-turbo");
        assert_eq!(config.completion.max_tokens, 500);
        assert!(config.notification.admin_recipient.is_none());
        assert!(config.chat_log.directory.is_absolute());
        assert!(config.chat_log.directory.ends_with("chat_history"));
    }

    #[test]
    fn test_sections_are_parsed() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("ama-bot.yaml");
        std::fs::write(
            &path,
            r"
gmail:
  redirect_mode: out_of_band
  grant_path: /var/lib/ama-bot/grant.json
  loopback_port: 8765
completion:
  model: gpt-4o-mini
  temperature: 0.2
chat_log:
  directory: /var/lib/ama-bot/chat_history
notification:
  admin_recipient: admin@example.com
log:
  filters: debug
",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.gmail.redirect_mode, RedirectMode::OutOfBand);
        assert_eq!(config.gmail.grant_path, Some(PathBuf::from("/var/lib/ama-bot/grant.json")));
        assert_eq!(config.gmail.loopback_address().port(), 8765);
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(config.chat_log.directory, PathBuf::from("/var/lib/ama-bot/chat_history"));
        assert_eq!(config.notification.admin_recipient.as_deref(), Some("admin@example.com"));
        assert_eq!(config.notification.subject_prefix, "AMA Bot: ");
        assert_eq!(config.log.filters, "debug");
    }

    #[test]
    fn test_default_config_round_trips_through_yaml() {
        let text = serde_yaml::to_string(&Config::default()).unwrap();

        let config: Config = serde_yaml::from_str(&text).unwrap();

        assert_eq!(config.chat_log, ChatLogConfig::default());
        assert_eq!(config.notification, NotificationConfig::default());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let directory = tempfile::tempdir().unwrap();

        let result = Config::load(directory.path().join("absent.yaml"));

        assert!(matches!(result, Err(Error::OpenConfig { .. })));
    }
}
