use std::time::Duration;

use ama_credential::{
    Acquisition, AuthorizationSession, CredentialManager, LoopbackReceiver, OperatorInput,
};
use snafu::ResultExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::execute;
use crate::{
    config::{Config, RedirectMode},
    error,
    error::Result,
};

/// Run the interactive authorization flow and persist the grant.
#[allow(clippy::result_large_err)]
pub fn authorize(config: &Config, manual: bool, print_secret: bool) -> Result<()> {
    execute(config, run(config, manual, print_secret))
}

async fn run(config: &Config, manual: bool, print_secret: bool) -> Result<()> {
    let manager = config.gmail.credential_manager()?;
    let use_loopback = !manual && config.gmail.redirect_mode == RedirectMode::Loopback;

    let receiver = if use_loopback {
        Some(LoopbackReceiver::bind(config.gmail.loopback_address()).await?)
    } else {
        None
    };
    let redirect = match receiver {
        Some(ref receiver) => receiver.redirect_target(),
        None => config.gmail.manual_redirect_target()?,
    };
    let mut session = AuthorizationSession::new(redirect);

    let credential = match manager.acquire(&mut session).await? {
        Acquisition::Ready(credential) => {
            write_stdout("Gmail is already authorized.\n").await?;
            credential
        }
        Acquisition::NeedsAuthorizationUrl(url) => {
            write_stdout(&format!("Open this URL to authorize sending email:\n\n{url}\n\n")).await?;
            let input = match receiver {
                Some(receiver) => {
                    let timeout = Duration::from_secs(config.gmail.authorization_timeout_seconds);
                    receiver.receive(timeout).await?
                }
                None => read_operator_input().await?,
            };
            let credential = manager.complete(&mut session, &input).await?;
            write_stdout("Authorization saved.\n").await?;
            credential
        }
    };
    tracing::info!(account = credential.account(), scopes = ?credential.scopes(), "Authorized");

    if print_secret {
        print_grant(&manager).await?;
    }
    Ok(())
}

async fn read_operator_input() -> Result<OperatorInput> {
    write_stdout("Paste the authorization code or the full redirect URL: ").await?;
    let mut line = String::new();
    let _bytes = BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context(error::ReadOperatorInputSnafu)?;
    Ok(OperatorInput::parse(&line))
}

async fn print_grant(manager: &CredentialManager) -> Result<()> {
    let Some(grant) = manager.cached_grant() else {
        return Ok(());
    };
    let json = serde_json::to_string(&grant).context(error::SerializeGrantSnafu)?;
    write_stdout(&format!("{json}\n")).await
}

async fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await.context(error::WriteStdoutSnafu)?;
    stdout.flush().await.context(error::WriteStdoutSnafu)
}
