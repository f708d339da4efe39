use std::path::Path;

use ama_bot_core::config::DocumentsConfig;
use snafu::{ensure, ResultExt};

use crate::error::{self, Result};

/// Pre-extracted text of the documents answers are grounded on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Documents {
    pub resume: String,
    pub background: String,
}

impl Documents {
    /// Reads both documents. A missing or blank document is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if either document cannot be read or is empty.
    pub async fn load(config: &DocumentsConfig) -> Result<Self> {
        let resume = read_document(&config.resume_path).await?;
        let background = read_document(&config.background_path).await?;
        Ok(Self { resume, background })
    }
}

async fn read_document(path: &Path) -> Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .context(error::ReadDocumentSnafu { path: path.to_path_buf() })?;
    ensure!(!text.trim().is_empty(), error::EmptyDocumentSnafu { path: path.to_path_buf() });

    tracing::debug!(path = %path.display(), bytes = text.len(), "Loaded document");
    Ok(text)
}
