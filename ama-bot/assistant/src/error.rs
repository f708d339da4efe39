use std::path::PathBuf;

use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Could not read document {}, error: {source}", path.display()))]
    ReadDocument { path: PathBuf, source: std::io::Error },

    #[snafu(display("Document {} is empty", path.display()))]
    EmptyDocument { path: PathBuf },

    #[snafu(display("Question is empty"))]
    EmptyQuestion,

    #[snafu(display("Could not build completion endpoint, error: {source}"))]
    BuildCompletionEndpoint { source: url::ParseError },

    #[snafu(display("Could not build HTTP client, error: {source}"))]
    BuildHttpClient { source: reqwest::Error },

    #[snafu(display("Completion request failed, error: {source}"))]
    CompletionRequest { source: reqwest::Error },

    #[snafu(display("Completion API rejected the request with status {status}: {detail}"))]
    CompletionRejected { status: u16, detail: String },

    #[snafu(display("Completion API returned no answer"))]
    EmptyCompletion,

    #[snafu(display("Could not create chat log directory {}, error: {source}", path.display()))]
    CreateChatLogDirectory { path: PathBuf, source: std::io::Error },

    #[snafu(display("Could not write chat log {}, error: {source}", path.display()))]
    WriteChatLog { path: PathBuf, source: std::io::Error },

    #[snafu(display("Could not read chat log {}, error: {source}", path.display()))]
    ReadChatLog { path: PathBuf, source: std::io::Error },
}
