use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use snafu::Snafu;
use url::Url;

/// Errors that can occur while acquiring a Gmail credential.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Neither a usable grant nor a client configuration is available.
    #[snafu(display("Gmail credential is not configured: {reason}"))]
    ConfigurationMissing { reason: &'static str },

    /// The provider rejected an authorization code or refresh token.
    #[snafu(display("Authorization exchange `{operation}` was rejected: {detail}"))]
    AuthExchangeFailed { operation: &'static str, detail: String },

    /// The state returned with the redirect is not the one that was sent.
    #[snafu(display("Authorization state does not match the pending request"))]
    StateMismatch,

    #[snafu(display("No authorization request is pending"))]
    NoPendingAuthorization,

    #[snafu(display("Could not find an authorization code in the supplied input"))]
    MissingAuthorizationCode,

    #[snafu(display(
        "Could not read client configuration from {}, error: {source}",
        path.display()
    ))]
    ReadClientConfiguration { path: PathBuf, source: std::io::Error },

    #[snafu(display("Could not parse client configuration, error: {source}"))]
    ParseClientConfiguration { source: serde_json::Error },

    #[snafu(display("Could not write grant to {}, error: {source}", path.display()))]
    WriteGrant { path: PathBuf, source: std::io::Error },

    #[snafu(display("Could not serialize grant, error: {source}"))]
    SerializeGrant { source: serde_json::Error },

    #[snafu(display("Endpoint {url} must use https"))]
    InsecureEndpoint { url: Url },

    #[snafu(display("Redirect URI {uri} must use https unless it targets a loopback address"))]
    InsecureRedirect { uri: Url },

    #[snafu(display("Address {address} is not a loopback address"))]
    NotLoopback { address: IpAddr },

    #[snafu(display("Could not build authorization URL, error: {source}"))]
    BuildAuthorizationUrl { source: url::ParseError },

    #[snafu(display("Could not build HTTP client, error: {source}"))]
    BuildHttpClient { source: reqwest::Error },

    #[snafu(display("Token endpoint request `{operation}` failed, error: {source}"))]
    TokenRequest { operation: &'static str, source: reqwest::Error },

    #[snafu(display("Could not bind loopback listener on {address}, error: {source}"))]
    BindLoopback { address: SocketAddr, source: std::io::Error },

    #[snafu(display("Loopback listener failed, error: {source}"))]
    ServeLoopback { source: std::io::Error },

    #[snafu(display("Loopback listener stopped before a redirect arrived"))]
    LoopbackClosed,

    #[snafu(display("No authorization redirect arrived within {seconds} seconds"))]
    LoopbackTimedOut { seconds: u64 },
}

/// Coarse classification callers use to pick a recovery path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal to the calling feature until configuration changes.
    ConfigurationMissing,
    /// Recoverable by running interactive authorization again.
    AuthExchangeFailed,
    /// Recoverable by restarting interactive authorization.
    StateMismatch,
    /// Local I/O, setup or transport problems.
    Other,
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigurationMissing { .. }
            | Self::ReadClientConfiguration { .. }
            | Self::ParseClientConfiguration { .. } => ErrorKind::ConfigurationMissing,
            Self::AuthExchangeFailed { .. }
            | Self::TokenRequest { .. }
            | Self::MissingAuthorizationCode
            | Self::NoPendingAuthorization
            | Self::LoopbackTimedOut { .. } => ErrorKind::AuthExchangeFailed,
            Self::StateMismatch => ErrorKind::StateMismatch,
            Self::WriteGrant { .. }
            | Self::SerializeGrant { .. }
            | Self::InsecureEndpoint { .. }
            | Self::InsecureRedirect { .. }
            | Self::NotLoopback { .. }
            | Self::BuildAuthorizationUrl { .. }
            | Self::BuildHttpClient { .. }
            | Self::BindLoopback { .. }
            | Self::ServeLoopback { .. }
            | Self::LoopbackClosed => ErrorKind::Other,
        }
    }

    /// A short next step for the operator.
    #[must_use]
    pub const fn remedy(&self) -> &'static str {
        match self.kind() {
            ErrorKind::ConfigurationMissing => {
                "configure `gmail.client_config_path` (or a grant) and run `ama-bot authorize`"
            }
            ErrorKind::AuthExchangeFailed | ErrorKind::StateMismatch => {
                "re-run `ama-bot authorize`"
            }
            ErrorKind::Other => "check the configuration and logs, then retry",
        }
    }
}
