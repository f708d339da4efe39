mod ask;
mod authorize;
mod history;
mod notify;

use std::{future::Future, process};

use ama_bot_core::{PROGRAM_NAME, PROJECT_SEMVER};
use ama_credential::{
    Acquisition, AuthenticatedHandle, AuthorizationSession, CredentialManager, RedirectTarget,
};
use snafu::ResultExt;

pub use self::{ask::ask, authorize::authorize, history::history, notify::notify};
use crate::{
    config::Config,
    error,
    error::{Error, Result},
    shadow::{BRANCH, SHORT_COMMIT},
};

/// Installs the logger and runs `task` to completion on a fresh runtime.
#[allow(clippy::result_large_err)]
fn execute<F>(config: &Config, task: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    config.log.install().context(error::InstallLoggerSnafu)?;

    tracing::info!(
        "{PROGRAM_NAME} {} ({BRANCH}@{SHORT_COMMIT}) is starting, pid: {}",
        *PROJECT_SEMVER,
        process::id()
    );

    let exit_status = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context(error::InitializeTokioRuntimeSnafu)
    {
        Ok(runtime) => runtime.block_on(task),
        Err(err) => Err(err),
    };

    if let Err(ref error) = exit_status {
        tracing::error!(%error);
    }

    exit_status
}

/// Acquires a credential without operator interaction.
///
/// # Errors
///
/// Returns [`Error::AuthorizationRequired`] when the cached grant is unusable.
async fn acquire_silently(manager: &CredentialManager) -> Result<AuthenticatedHandle> {
    let mut session = AuthorizationSession::new(RedirectTarget::OutOfBand);
    match manager.acquire(&mut session).await? {
        Acquisition::Ready(credential) => Ok(credential),
        Acquisition::NeedsAuthorizationUrl(url) => Err(Error::AuthorizationRequired { url }),
    }
}
