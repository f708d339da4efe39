use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use snafu::{ensure, ResultExt};
use url::Url;

use crate::{
    error::{self, Error},
    AuthorizationGrant, ClientConfiguration, MAIL_SEND_SCOPE,
};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,

    #[serde(default)]
    expires_in: Option<i64>,

    #[serde(default)]
    refresh_token: Option<String>,

    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn expiry(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in.map(|seconds| issued_at + Duration::seconds(seconds))
    }
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,

    #[serde(default)]
    error_description: Option<String>,
}

/// Client for the provider's token endpoint.
#[derive(Clone, Debug)]
pub struct TokenClient {
    http: reqwest::Client,
    require_tls: bool,
}

impl TokenClient {
    /// Creates a client that only talks to https endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .https_only(true)
            .build()
            .context(error::BuildHttpClientSnafu)?;
        Ok(Self { http, require_tls: true })
    }

    #[cfg(test)]
    pub(crate) fn plaintext() -> Self { Self { http: reqwest::Client::new(), require_tls: false } }

    /// Exchanges an authorization code for a new grant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthExchangeFailed`] if the provider rejects the code
    /// or does not grant the mail-send scope.
    #[tracing::instrument(skip_all, fields(token_endpoint = %client.token_endpoint))]
    pub async fn exchange_code(
        &self,
        client: &ClientConfiguration,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthorizationGrant, Error> {
        const OPERATION: &str = "authorization_code";

        let issued_at = Utc::now();
        let response = self
            .request(
                OPERATION,
                &client.token_endpoint,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                    ("client_id", client.client_id.as_str()),
                    ("client_secret", client.client_secret.as_str()),
                ],
            )
            .await?;

        let scopes: BTreeSet<String> = match response.scope.as_deref() {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => BTreeSet::from([MAIL_SEND_SCOPE.to_string()]),
        };
        ensure!(
            scopes.contains(MAIL_SEND_SCOPE),
            error::AuthExchangeFailedSnafu {
                operation: OPERATION,
                detail: format!("granted scopes do not include {MAIL_SEND_SCOPE}"),
            }
        );
        if response.refresh_token.is_none() {
            tracing::warn!("Provider issued a grant without a refresh token");
        }

        Ok(AuthorizationGrant {
            expiry: response.expiry(issued_at),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_endpoint: client.token_endpoint.clone(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            scopes,
        })
    }

    /// Refreshes `grant` in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthExchangeFailed`] if the refresh token is revoked
    /// or invalid, or a transport error.
    #[tracing::instrument(skip_all, fields(token_endpoint = %grant.token_endpoint))]
    pub async fn refresh(&self, grant: &mut AuthorizationGrant) -> Result<(), Error> {
        const OPERATION: &str = "refresh_token";

        let refresh_token = grant.refresh_token.clone().unwrap_or_default();
        ensure!(
            !refresh_token.is_empty(),
            error::AuthExchangeFailedSnafu {
                operation: OPERATION,
                detail: "grant carries no refresh token".to_string(),
            }
        );

        let issued_at = Utc::now();
        let response = self
            .request(
                OPERATION,
                &grant.token_endpoint,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                    ("client_id", grant.client_id.as_str()),
                    ("client_secret", grant.client_secret.as_str()),
                ],
            )
            .await?;

        let expiry = response.expiry(issued_at);
        grant.apply_refresh(response.access_token, expiry, response.refresh_token);
        tracing::info!(expiry = ?grant.expiry, "Refreshed Gmail access token");
        Ok(())
    }

    async fn request(
        &self,
        operation: &'static str,
        endpoint: &Url,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, Error> {
        if self.require_tls {
            ensure!(
                endpoint.scheme() == "https",
                error::InsecureEndpointSnafu { url: endpoint.clone() }
            );
        }

        let response = self
            .http
            .post(endpoint.clone())
            .form(form)
            .send()
            .await
            .context(error::TokenRequestSnafu { operation })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TokenErrorResponse>(&body).map_or_else(
                |_| format!("HTTP {status}: {body}"),
                |TokenErrorResponse { error, error_description }| match error_description {
                    Some(description) => format!("{error}: {description}"),
                    None => error,
                },
            );
            tracing::warn!(operation, %status, %detail, "Token endpoint rejected request");
            return error::AuthExchangeFailedSnafu { operation, detail }.fail();
        }

        response.json().await.context(error::TokenRequestSnafu { operation })
    }
}
