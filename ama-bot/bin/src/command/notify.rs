use notification::{gmail, NotificationClient};
use snafu::OptionExt;

use super::{acquire_silently, execute};
use crate::{config::Config, error, error::Result};

/// Send one email with the saved Gmail credential.
#[allow(clippy::result_large_err)]
pub fn notify(config: &Config, to: Option<String>, subject: &str, body: &str) -> Result<()> {
    execute(config, run(config, to, subject, body))
}

async fn run(config: &Config, to: Option<String>, subject: &str, body: &str) -> Result<()> {
    let to = to
        .or_else(|| config.notification.admin_recipient.clone())
        .context(error::MissingRecipientSnafu)?;

    let manager = config.gmail.credential_manager()?;
    let credential = acquire_silently(&manager).await?;
    let client = gmail::Client::new(&config.gmail.notification_config())?;

    client.send(&credential, &to, subject, body).await?;
    tracing::info!(%to, "Notification sent");
    Ok(())
}
