use std::{io, io::Write};

use ama_bot_assistant::ChatLog;
use snafu::ResultExt;

use super::execute;
use crate::{config::Config, error, error::Result};

const NO_HISTORY: &str = "No saved chat history found yet.";

/// Print the master chat log.
#[allow(clippy::result_large_err)]
pub fn history(config: &Config) -> Result<()> {
    execute(config, run(ChatLog::new(config.chat_log.directory.clone())))
}

async fn run(chat_log: ChatLog) -> Result<()> {
    let text = chat_log.read_master().await?.unwrap_or_else(|| format!("{NO_HISTORY}\n"));
    io::stdout().write_all(text.as_bytes()).context(error::WriteStdoutSnafu)
}
