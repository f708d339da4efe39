//! Gmail API client implementation for sending emails as the account that
//! authorized the credential.

use ama_credential::AuthenticatedHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};
use url::Url;

use crate::{
    error::{self, Error},
    NotificationClient, OutboundMessage,
};

/// Public Gmail API endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://gmail.googleapis.com";

const SEND_PATH: &str = "gmail/v1/users/me/messages/send";

/// Configuration for the Gmail client.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the Gmail API. Must use https.
    #[serde(default = "Config::default_api_endpoint")]
    pub api_endpoint: String,
}

impl Config {
    #[must_use]
    pub fn default_api_endpoint() -> String { DEFAULT_API_ENDPOINT.to_string() }
}

impl Default for Config {
    fn default() -> Self { Self { api_endpoint: Self::default_api_endpoint() } }
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Gmail API client for sending emails.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    send_endpoint: Url,
}

impl Client {
    /// Creates a new Gmail client.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the API endpoint is not https
    /// - the send endpoint cannot be derived from it
    /// - the HTTP client cannot be built
    ///
    /// # Example
    ///
    /// ```no_run
    /// use notification::gmail::{Client, Config};
    ///
    /// # fn example() -> Result<(), notification::Error> {
    /// let client = Client::new(&Config::default())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: &Config) -> Result<Self, Error> {
        let api_endpoint =
            Url::parse(&config.api_endpoint).context(error::BuildSendEndpointSnafu)?;
        ensure!(
            api_endpoint.scheme() == "https",
            error::InsecureEndpointSnafu { url: api_endpoint.clone() }
        );

        let http = reqwest::Client::builder()
            .https_only(true)
            .build()
            .context(error::BuildHttpClientSnafu)?;
        Ok(Self { http, send_endpoint: send_endpoint(&api_endpoint)? })
    }

    #[cfg(test)]
    fn plaintext(api_endpoint: &Url) -> Self {
        Self { http: reqwest::Client::new(), send_endpoint: send_endpoint(api_endpoint).unwrap() }
    }

    #[must_use]
    pub const fn send_endpoint(&self) -> &Url { &self.send_endpoint }
}

fn send_endpoint(api_endpoint: &Url) -> Result<Url, Error> {
    let mut base = api_endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(SEND_PATH).context(error::BuildSendEndpointSnafu)
}

#[async_trait]
impl NotificationClient for Client {
    #[tracing::instrument(skip_all, fields(to = %message.to))]
    async fn send_notification(
        &self,
        credential: &AuthenticatedHandle,
        message: &OutboundMessage,
    ) -> Result<(), Error> {
        let raw = message.to_raw()?;

        let response = self
            .http
            .post(self.send_endpoint.clone())
            .bearer_auth(credential.access_token())
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "Gmail send request failed");
                Error::SendFailed { status: None, detail: err.to_string() }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body).map_or_else(
                |_| format!("HTTP {status}: {body}"),
                |response| response.error.message,
            );
            tracing::error!(%status, %detail, "Gmail rejected the message");
            return error::SendFailedSnafu { status: Some(status.as_u16()), detail }.fail();
        }

        let id = response.json::<SendResponse>().await.ok().and_then(|response| response.id);
        tracing::info!(message_id = ?id, "Successfully sent email");
        Ok(())
    }
}
