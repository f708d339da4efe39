use snafu::Snafu;
use url::Url;

use crate::config;

/// Result type alias for the CLI.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for the CLI.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"))]
    Config { source: config::Error },

    #[snafu(display("Could not initialize tokio runtime, error: {source}"))]
    InitializeTokioRuntime { source: tokio::io::Error },

    #[snafu(display("{source}"))]
    InstallLogger { source: ama_cli_common::config::LogError },

    #[snafu(display("{source}, {}", source.remedy()))]
    Credential { source: ama_credential::Error },

    #[snafu(display("Gmail is not authorized, run `ama-bot authorize` and open {url}"))]
    AuthorizationRequired { url: Url },

    #[snafu(display("{source}"))]
    Notification { source: notification::Error },

    #[snafu(display("{source}"))]
    Assistant { source: ama_bot_assistant::Error },

    #[snafu(display(
        "No recipient, pass `--to` or set `notification.admin_recipient` in the config"
    ))]
    MissingRecipient,

    #[snafu(display("Could not read operator input, error: {source}"))]
    ReadOperatorInput { source: std::io::Error },

    #[snafu(display("Could not write to stdout, error: {source}"))]
    WriteStdout { source: std::io::Error },

    #[snafu(display("Could not serialize grant, error: {source}"))]
    SerializeGrant { source: serde_json::Error },

    #[snafu(display("Could not serialize config, error: {source}"))]
    SerializeConfig { source: serde_yaml::Error },
}

impl From<config::Error> for Error {
    fn from(source: config::Error) -> Self { Self::Config { source } }
}

impl From<ama_credential::Error> for Error {
    fn from(source: ama_credential::Error) -> Self { Self::Credential { source } }
}

impl From<notification::Error> for Error {
    fn from(source: notification::Error) -> Self { Self::Notification { source } }
}

impl From<ama_bot_assistant::Error> for Error {
    fn from(source: ama_bot_assistant::Error) -> Self { Self::Assistant { source } }
}

pub trait CommandError {
    fn exit_code(&self) -> exitcode::ExitCode;
}

impl CommandError for Error {
    fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            Self::Config { .. } | Self::InstallLogger { .. } => exitcode::CONFIG,
            Self::Credential { source } => match source.kind() {
                ama_credential::ErrorKind::ConfigurationMissing => exitcode::CONFIG,
                ama_credential::ErrorKind::AuthExchangeFailed
                | ama_credential::ErrorKind::StateMismatch => exitcode::NOPERM,
                ama_credential::ErrorKind::Other => exitcode::SOFTWARE,
            },
            Self::AuthorizationRequired { .. } => exitcode::NOPERM,
            Self::MissingRecipient => exitcode::USAGE,
            Self::Notification { .. } => exitcode::UNAVAILABLE,
            Self::Assistant { source } => match source {
                ama_bot_assistant::Error::EmptyQuestion => exitcode::USAGE,
                ama_bot_assistant::Error::ReadDocument { .. }
                | ama_bot_assistant::Error::EmptyDocument { .. } => exitcode::NOINPUT,
                _ => exitcode::SOFTWARE,
            },
            Self::InitializeTokioRuntime { .. }
            | Self::ReadOperatorInput { .. }
            | Self::WriteStdout { .. } => exitcode::IOERR,
            Self::SerializeGrant { .. } | Self::SerializeConfig { .. } => exitcode::SOFTWARE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_credential_error_kind() {
        let missing: Error =
            ama_credential::Error::ConfigurationMissing { reason: "no client" }.into();
        assert_eq!(missing.exit_code(), exitcode::CONFIG);
        assert!(missing.to_string().contains("ama-bot authorize"));

        let mismatch: Error = ama_credential::Error::StateMismatch.into();
        assert_eq!(mismatch.exit_code(), exitcode::NOPERM);

        let empty: Error = ama_bot_assistant::Error::EmptyQuestion.into();
        assert_eq!(empty.exit_code(), exitcode::USAGE);
    }
}
