use std::{
    fmt::{self, Debug, Formatter},
    path::Path,
};

use serde::Deserialize;
use snafu::ResultExt;
use url::Url;

use crate::{
    error::{self, Error},
    grant::redact,
    AuthorizationGrant,
};

/// Consent endpoint assumed when only a cached grant is available.
pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";

/// OAuth client registration, as downloaded from the provider console.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfiguration {
    pub client_id: String,

    pub client_secret: String,

    #[serde(rename = "auth_uri")]
    pub authorization_endpoint: Url,

    #[serde(rename = "token_uri")]
    pub token_endpoint: Url,

    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

// The console wraps the registration in an object keyed by application type.
#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ClientSecretsFile {
    Installed(ClientConfiguration),
    Web(ClientConfiguration),
}

impl ClientConfiguration {
    /// Parses a client secrets document. Blank input means "not configured".
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not blank and not a client secrets
    /// document.
    pub fn from_json(json: &str) -> Result<Option<Self>, Error> {
        if json.trim().is_empty() {
            return Ok(None);
        }

        let file: ClientSecretsFile =
            serde_json::from_str(json).context(error::ParseClientConfigurationSnafu)?;
        Ok(Some(match file {
            ClientSecretsFile::Installed(config) | ClientSecretsFile::Web(config) => config,
        }))
    }

    /// Reads a client secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Option<Self>, Error> {
        let json = std::fs::read_to_string(&path)
            .context(error::ReadClientConfigurationSnafu { path: path.as_ref().to_path_buf() })?;
        Self::from_json(&json)
    }

    /// Recovers the registration a cached grant was issued to, so an
    /// unusable grant can be replaced without a client secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the default authorization endpoint is malformed.
    pub fn from_grant(grant: &AuthorizationGrant) -> Result<Self, Error> {
        let authorization_endpoint = Url::parse(DEFAULT_AUTHORIZATION_ENDPOINT)
            .context(error::BuildAuthorizationUrlSnafu)?;
        Ok(Self {
            client_id: grant.client_id.clone(),
            client_secret: grant.client_secret.clone(),
            authorization_endpoint,
            token_endpoint: grant.token_endpoint.clone(),
            redirect_uris: Vec::new(),
        })
    }
}

impl Debug for ClientConfiguration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfiguration")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("authorization_endpoint", &self.authorization_endpoint.as_str())
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("redirect_uris", &self.redirect_uris)
            .finish()
    }
}
