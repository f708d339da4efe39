use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use chrono::Utc;
use snafu::ResultExt;

use crate::{
    assess,
    error::{self, Error},
    AuthorizationGrant, GrantStatus,
};

/// Where grants come from and where they are written back to.
///
/// A grant saved through this store wins over every other source. Otherwise
/// a valid secret value (inline configuration or environment) is used, then a
/// usable grant file, then whatever the secret holds. Writes go to the grant
/// file; secret stores are read-only from here.
#[derive(Debug, Default)]
pub struct GrantStore {
    secret: Option<String>,
    file_path: Option<PathBuf>,
    saved: Mutex<Option<AuthorizationGrant>>,
}

impl GrantStore {
    #[must_use]
    pub fn new(secret: Option<String>, file_path: Option<PathBuf>) -> Self {
        let secret = secret.filter(|secret| !secret.trim().is_empty());
        Self { secret, file_path, saved: Mutex::default() }
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&Path> { self.file_path.as_deref() }

    /// Loads the cached grant. Malformed or unreadable grants count as
    /// absent.
    #[must_use]
    pub fn load(&self) -> Option<AuthorizationGrant> {
        let saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(grant) = saved {
            tracing::debug!("Using the Gmail grant saved by this process");
            return Some(grant);
        }

        let now = Utc::now();
        match self.load_secret() {
            Some(grant) if assess(&grant, now) == GrantStatus::Valid => {
                tracing::info!("Loaded Gmail grant from secret store");
                Some(grant)
            }
            secret => match (secret, self.load_file()) {
                (_, Some(file)) if assess(&file, now) != GrantStatus::Unusable => {
                    tracing::info!("Loaded Gmail grant from file");
                    Some(file)
                }
                (Some(secret), _) => {
                    tracing::info!("Loaded stale Gmail grant from secret store");
                    Some(secret)
                }
                (None, file) => file,
            },
        }
    }

    fn load_secret(&self) -> Option<AuthorizationGrant> {
        let secret = self.secret.as_ref()?;
        AuthorizationGrant::from_json(secret)
            .inspect_err(|err| {
                tracing::warn!(error = %err, "Ignoring malformed Gmail grant in secret store");
            })
            .ok()
    }

    fn load_file(&self) -> Option<AuthorizationGrant> {
        let path = self.file_path.as_ref()?;
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No cached Gmail grant file");
                return None;
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Could not read Gmail grant file"
                );
                return None;
            }
        };

        AuthorizationGrant::from_json(&json)
            .inspect_err(|err| {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Ignoring structurally incompatible Gmail grant file"
                );
            })
            .ok()
    }

    /// Writes `grant` to the grant file, readable by the owner only, and
    /// makes it the grant later loads return.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant cannot be serialized or written.
    pub fn save(&self, grant: &AuthorizationGrant) -> Result<(), Error> {
        if let Some(path) = &self.file_path {
            write_grant_file(path, grant)?;
            tracing::info!(path = %path.display(), "Persisted Gmail grant");
        } else {
            tracing::warn!("No Gmail grant file configured, the grant is kept in memory only");
        }

        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(grant.clone());
        Ok(())
    }
}

fn write_grant_file(path: &Path, grant: &AuthorizationGrant) -> Result<(), Error> {
    let json = grant.to_json().context(error::SerializeGrantSnafu)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(error::WriteGrantSnafu { path })?;
    }

    let mut options = fs::OpenOptions::new();
    let _ = options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let _ = options.mode(0o600);
    }

    let mut file = options.open(path).context(error::WriteGrantSnafu { path })?;
    file.write_all(json.as_bytes()).context(error::WriteGrantSnafu { path })
}
