use std::{
    io,
    path::{Path, PathBuf},
};

use ama_bot_core::{model::Exchange, MASTER_CHAT_LOG_NAME};
use snafu::ResultExt;
use tokio::{fs, io::AsyncWriteExt};

use crate::error::{self, Result};

/// Per-exchange files plus one append-only master log, all in one directory.
#[derive(Clone, Debug)]
pub struct ChatLog {
    directory: PathBuf,
}

impl ChatLog {
    #[must_use]
    pub const fn new(directory: PathBuf) -> Self { Self { directory } }

    #[must_use]
    pub fn directory(&self) -> &Path { &self.directory }

    #[must_use]
    pub fn master_path(&self) -> PathBuf { self.directory.join(MASTER_CHAT_LOG_NAME) }

    /// Writes `exchange` to its own file and appends it to the master log.
    /// Returns the path of the exchange file. Existing exchange files are
    /// never overwritten; a numeric suffix is added instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or either file cannot be written.
    pub async fn record(&self, exchange: &Exchange) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)
            .await
            .context(error::CreateChatLogDirectorySnafu { path: self.directory.clone() })?;

        let entry = exchange.to_string();

        let (exchange_path, mut file) = self.create_exchange_file(exchange).await?;
        file.write_all(entry.as_bytes())
            .await
            .context(error::WriteChatLogSnafu { path: exchange_path.clone() })?;
        file.flush().await.context(error::WriteChatLogSnafu { path: exchange_path.clone() })?;

        let path = self.master_path();
        let mut master = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context(error::WriteChatLogSnafu { path: path.clone() })?;
        master
            .write_all(format!("\n{entry}").as_bytes())
            .await
            .context(error::WriteChatLogSnafu { path: path.clone() })?;
        master.flush().await.context(error::WriteChatLogSnafu { path })?;

        tracing::info!(file = %exchange_path.display(), "Recorded exchange");
        Ok(exchange_path)
    }

    async fn create_exchange_file(&self, exchange: &Exchange) -> Result<(PathBuf, fs::File)> {
        let mut attempt = 0;
        loop {
            let name = if attempt == 0 {
                exchange.file_name()
            } else {
                exchange.numbered_file_name(attempt)
            };
            let path = self.directory.join(name);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(error::Error::WriteChatLog { path, source }),
            }
        }
    }

    /// Reads the master log. `None` means nothing has been logged yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the master log exists but cannot be read.
    pub async fn read_master(&self) -> Result<Option<String>> {
        let path = self.master_path();
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(error::Error::ReadChatLog { path, source }),
        }
    }
}
