use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use ama_credential::{ClientConfiguration, CredentialManager, GrantStore, RedirectTarget};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use url::Url;

use crate::config::{error, Error};

pub const GRANT_ENV: &str = "AMA_BOT_GMAIL_TOKEN";
pub const CLIENT_CONFIG_ENV: &str = "AMA_BOT_GMAIL_CLIENT_CONFIG";

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectMode {
    /// Capture the redirect with a listener on this machine.
    #[default]
    Loopback,
    /// Redirect to `redirect_uri`; the operator pastes the final URL.
    Hosted,
    /// The provider displays the code; the operator pastes it.
    OutOfBand,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GmailConfig {
    #[serde(default = "GmailConfig::default_client_config_path")]
    pub client_config_path: Option<PathBuf>,

    /// Inline client secrets JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_config: Option<String>,

    #[serde(default = "GmailConfig::default_grant_path")]
    pub grant_path: Option<PathBuf>,

    /// Inline grant JSON, read before `grant_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<String>,

    #[serde(default)]
    pub redirect_mode: RedirectMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<Url>,

    #[serde(default = "GmailConfig::default_loopback_host")]
    pub loopback_host: IpAddr,

    #[serde(default = "GmailConfig::default_loopback_port")]
    pub loopback_port: u16,

    #[serde(default = "GmailConfig::default_authorization_timeout_seconds")]
    pub authorization_timeout_seconds: u64,

    #[serde(default = "notification::gmail::Config::default_api_endpoint")]
    pub api_endpoint: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            client_config_path: Self::default_client_config_path(),
            client_config: None,
            grant_path: Self::default_grant_path(),
            grant: None,
            redirect_mode: RedirectMode::default(),
            redirect_uri: None,
            loopback_host: Self::default_loopback_host(),
            loopback_port: Self::default_loopback_port(),
            authorization_timeout_seconds: Self::default_authorization_timeout_seconds(),
            api_endpoint: notification::gmail::Config::default_api_endpoint(),
        }
    }
}

impl GmailConfig {
    #[inline]
    pub fn default_client_config_path() -> Option<PathBuf> {
        Some(ama_bot_core::PROJECT_CONFIG_DIR.join(ama_bot_core::CLIENT_CONFIG_FILE_NAME))
    }

    #[inline]
    pub fn default_grant_path() -> Option<PathBuf> {
        Some(ama_bot_core::PROJECT_DATA_DIR.join(ama_bot_core::GRANT_FILE_NAME))
    }

    #[inline]
    pub const fn default_loopback_host() -> IpAddr { ama_bot_core::DEFAULT_LOOPBACK_HOST }

    #[inline]
    pub const fn default_loopback_port() -> u16 { ama_bot_core::DEFAULT_LOOPBACK_PORT }

    #[inline]
    pub const fn default_authorization_timeout_seconds() -> u64 { 300 }

    #[inline]
    pub const fn loopback_address(&self) -> SocketAddr {
        SocketAddr::new(self.loopback_host, self.loopback_port)
    }

    /// Client registration from the environment, the inline value or the
    /// client secrets file, in that order. A missing file means none.
    pub fn client_configuration(&self) -> Result<Option<ClientConfiguration>, Error> {
        self.client_configuration_with(std::env::var(CLIENT_CONFIG_ENV).ok())
    }

    fn client_configuration_with(
        &self,
        from_env: Option<String>,
    ) -> Result<Option<ClientConfiguration>, Error> {
        let inline = from_env.or_else(|| self.client_config.clone());
        if let Some(json) = inline.filter(|json| !json.trim().is_empty()) {
            return ClientConfiguration::from_json(&json)
                .context(error::LoadClientConfigurationSnafu);
        }

        match self.client_config_path.as_deref() {
            Some(path) if path.exists() => ClientConfiguration::from_path(path)
                .context(error::LoadClientConfigurationSnafu),
            Some(path) => {
                tracing::debug!(path = %path.display(), "No Gmail client configuration file");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn grant_store(&self) -> GrantStore {
        self.grant_store_with(std::env::var(GRANT_ENV).ok())
    }

    fn grant_store_with(&self, from_env: Option<String>) -> GrantStore {
        let secret = from_env.filter(|json| !json.trim().is_empty()).or_else(|| self.grant.clone());
        GrantStore::new(secret, self.grant_path.clone())
    }

    pub fn credential_manager(&self) -> Result<CredentialManager, Error> {
        CredentialManager::new(self.client_configuration()?, self.grant_store())
            .context(error::BuildCredentialManagerSnafu)
    }

    /// Redirect target for flows where the operator pastes the result.
    pub fn manual_redirect_target(&self) -> Result<RedirectTarget, Error> {
        match self.redirect_mode {
            RedirectMode::Hosted => {
                let uri = self.redirect_uri.clone().context(error::HostedRedirectRequiredSnafu)?;
                RedirectTarget::hosted(uri).context(error::InvalidRedirectTargetSnafu)
            }
            RedirectMode::Loopback | RedirectMode::OutOfBand => Ok(RedirectTarget::OutOfBand),
        }
    }

    pub fn notification_config(&self) -> notification::gmail::Config {
        notification::gmail::Config { api_endpoint: self.api_endpoint.clone() }
    }

    pub(super) fn resolve_paths(
        &mut self,
        resolve: impl Fn(PathBuf) -> Result<PathBuf, Error>,
    ) -> Result<(), Error> {
        self.client_config_path = self.client_config_path.take().map(&resolve).transpose()?;
        self.grant_path = self.grant_path.take().map(&resolve).transpose()?;
        Ok(())
    }
}
