use std::{io, io::Write};

use ama_bot_assistant::{Assistant, ExchangeNotifier, Warning};
use ama_bot_core::config::AssistantConfig;
use notification::gmail;
use snafu::ResultExt;

use super::{acquire_silently, execute};
use crate::{config::Config, error, error::Result};

/// Answer one question, log it and email the administrator a copy.
#[allow(clippy::result_large_err)]
pub fn ask(config: &Config, question: &str) -> Result<()> {
    let assistant_config = config.assistant_config()?;
    execute(config, run(config, assistant_config, question))
}

async fn run(config: &Config, assistant_config: AssistantConfig, question: &str) -> Result<()> {
    let mut skipped = None;
    let notifier = match config.notification.admin_recipient.clone() {
        Some(recipient) => match build_notifier(config, recipient).await {
            Ok(notifier) => Some(notifier),
            Err(err) => {
                tracing::warn!(error = %err, "Notifications are disabled for this question");
                skipped = Some(Warning::NotificationSkipped(err.to_string()));
                None
            }
        },
        None => None,
    };

    let assistant = Assistant::new(assistant_config, notifier).await?;
    let mut outcome = assistant.ask(question).await?;
    outcome.warnings.extend(skipped);

    writeln!(io::stdout(), "{}", outcome.exchange.answer).context(error::WriteStdoutSnafu)?;
    for warning in &outcome.warnings {
        eprintln!("Warning: {warning}");
    }
    Ok(())
}

async fn build_notifier(config: &Config, recipient: String) -> Result<ExchangeNotifier> {
    let manager = config.gmail.credential_manager()?;
    let credential = acquire_silently(&manager).await?;
    let client = gmail::Client::new(&config.gmail.notification_config())?;
    Ok(ExchangeNotifier::new(
        Box::new(client),
        credential,
        recipient,
        config.notification.subject_prefix.clone(),
    ))
}
