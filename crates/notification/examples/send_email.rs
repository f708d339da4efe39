//! Example: Send one email through the Gmail API with a cached user grant.
//!
//! # Prerequisites
//!
//! 1. Authorize once with `ama-bot authorize`, which writes the grant file
//! 2. Point `AMA_BOT_GMAIL_GRANT_PATH` at that file
//! 3. Set `AMA_BOT_NOTIFY_TO` to the recipient
//!
//! # Usage
//!
//! ```bash
//! export AMA_BOT_GMAIL_GRANT_PATH="$HOME/.local/share/ama-bot/gmail-grant.json"
//! export AMA_BOT_NOTIFY_TO="admin@example.com"
//! cargo run --example send_email
//! ```

use ama_credential::{
    Acquisition, AuthorizationSession, CredentialManager, GrantStore, RedirectTarget,
};
use notification::{
    gmail::{Client, Config},
    NotificationClient,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let grant_path = std::env::var_os("AMA_BOT_GMAIL_GRANT_PATH").map(Into::into);
    let to = std::env::var("AMA_BOT_NOTIFY_TO")?;

    let manager = CredentialManager::new(None, GrantStore::new(None, grant_path))?;
    let mut session = AuthorizationSession::new(RedirectTarget::OutOfBand);
    let credential = match manager.acquire(&mut session).await? {
        Acquisition::Ready(credential) => credential,
        Acquisition::NeedsAuthorizationUrl(url) => {
            tracing::error!("The cached grant is unusable, authorize again at {url}");
            return Ok(());
        }
    };

    let client = Client::new(&Config::default())?;

    tracing::info!("Sending email");
    client.send(&credential, &to, "ama-bot test message", "Sent by the send_email example.").await?;

    tracing::info!("Email sent successfully");
    Ok(())
}
