use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Could not open config from {}, error: {source}", filename.display()))]
    OpenConfig { filename: PathBuf, source: std::io::Error },

    #[snafu(display("Could not parse config from {}, error: {source}", filename.display()))]
    ParseConfig { filename: PathBuf, source: serde_yaml::Error },

    #[snafu(display("Could not resolve file path {}, error: {source}", file_path.display()))]
    ResolveFilePath { file_path: PathBuf, source: std::io::Error },

    #[snafu(display("Could not load Gmail client configuration, error: {source}"))]
    LoadClientConfiguration { source: ama_credential::Error },

    #[snafu(display("Could not set up the Gmail credential manager, error: {source}"))]
    BuildCredentialManager { source: ama_credential::Error },

    #[snafu(display("`gmail.redirect_mode: hosted` requires `gmail.redirect_uri`"))]
    HostedRedirectRequired,

    #[snafu(display("Invalid Gmail redirect target, error: {source}"))]
    InvalidRedirectTarget { source: ama_credential::Error },

    #[snafu(display("Invalid completion API endpoint `{value}`, error: {source}"))]
    ParseCompletionEndpoint { value: String, source: url::ParseError },

    #[snafu(display(
        "No completion API key, set `completion.api_key` or the OPENAI_API_KEY environment variable"
    ))]
    MissingCompletionApiKey,
}
