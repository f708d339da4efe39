use std::{
    collections::BTreeSet,
    fmt::{self, Debug, Formatter},
};

use chrono::Utc;
use snafu::OptionExt;
use url::Url;

use crate::{
    error::{self, Error},
    grant::redact,
    token_endpoint::TokenClient,
    assess, AuthorizationGrant, AuthorizationSession, ClientConfiguration, GrantStatus, GrantStore,
    OperatorInput, PendingAuthorizationRequest,
};

/// The account every Gmail call is made on behalf of: the authorizing user.
pub const AUTHORIZED_ACCOUNT: &str = "me";

/// A usable credential for the mail-send scope.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedHandle {
    access_token: String,
    scopes: BTreeSet<String>,
}

impl AuthenticatedHandle {
    /// Wraps a grant that is already known to be valid.
    #[must_use]
    pub fn from_grant(grant: &AuthorizationGrant) -> Self {
        Self { access_token: grant.access_token.clone(), scopes: grant.scopes.clone() }
    }

    #[must_use]
    pub fn access_token(&self) -> &str { &self.access_token }

    #[must_use]
    pub const fn account(&self) -> &'static str { AUTHORIZED_ACCOUNT }

    #[must_use]
    pub const fn scopes(&self) -> &BTreeSet<String> { &self.scopes }
}

impl Debug for AuthenticatedHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedHandle")
            .field("access_token", &redact(&self.access_token))
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Outcome of [`CredentialManager::acquire`].
#[derive(Debug)]
pub enum Acquisition {
    /// A cached or refreshed grant is usable.
    Ready(AuthenticatedHandle),
    /// The operator has to visit this URL and hand the result to
    /// [`CredentialManager::complete`].
    NeedsAuthorizationUrl(Url),
}

/// Produces valid credentials for the mail-send scope, refreshing or
/// re-authorizing as needed.
#[derive(Debug)]
pub struct CredentialManager {
    client: Option<ClientConfiguration>,
    store: GrantStore,
    tokens: TokenClient,
}

impl CredentialManager {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(client: Option<ClientConfiguration>, store: GrantStore) -> Result<Self, Error> {
        Ok(Self { client, store, tokens: TokenClient::new()? })
    }

    #[cfg(test)]
    pub(crate) fn with_plaintext_endpoints(
        client: Option<ClientConfiguration>,
        store: GrantStore,
    ) -> Self {
        Self { client, store, tokens: TokenClient::plaintext() }
    }

    #[must_use]
    pub const fn store(&self) -> &GrantStore { &self.store }

    /// The grant last issued or refreshed by this manager, else the one the
    /// store would load.
    #[must_use]
    pub fn cached_grant(&self) -> Option<AuthorizationGrant> { self.store.load() }

    /// Returns a usable credential or starts interactive authorization.
    ///
    /// A valid cached grant costs no network call. An expired grant with a
    /// refresh token costs exactly one. A pending request left over from an
    /// earlier call is discarded first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationMissing`] if interactive authorization is
    /// needed but no client registration is known, or an error if a
    /// refreshed grant cannot be persisted.
    #[tracing::instrument(skip_all)]
    pub async fn acquire(&self, session: &mut AuthorizationSession) -> Result<Acquisition, Error> {
        session.discard_pending();

        let cached = self.store.load();
        if let Some(mut grant) = cached.clone() {
            match assess(&grant, Utc::now()) {
                GrantStatus::Valid => {
                    tracing::debug!("Cached Gmail grant is valid");
                    return Ok(Acquisition::Ready(AuthenticatedHandle::from_grant(&grant)));
                }
                GrantStatus::Refreshable => match self.tokens.refresh(&mut grant).await {
                    Ok(()) => {
                        self.store.save(&grant)?;
                        return Ok(Acquisition::Ready(AuthenticatedHandle::from_grant(&grant)));
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            "Could not refresh Gmail grant, falling back to interactive authorization"
                        );
                    }
                },
                GrantStatus::Unusable => {
                    tracing::info!("Cached Gmail grant is unusable");
                }
            }
        }

        let client = match (&self.client, &cached) {
            (Some(client), _) => client.clone(),
            (None, Some(grant)) => ClientConfiguration::from_grant(grant)?,
            (None, None) => {
                return error::ConfigurationMissingSnafu {
                    reason: "no cached grant and no OAuth client configuration",
                }
                .fail();
            }
        };

        let pending = PendingAuthorizationRequest::new(client, session.redirect())?;
        let url = session.begin(pending).clone();
        tracing::info!(
            redirect_uri = %session.redirect().redirect_uri(),
            "Interactive authorization required"
        );
        Ok(Acquisition::NeedsAuthorizationUrl(url))
    }

    /// Exchanges the operator's input for a grant and persists it.
    ///
    /// The pending request is consumed whether or not this succeeds, so a
    /// failed attempt has to restart with [`Self::acquire`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPendingAuthorization`] without a preceding
    /// [`Self::acquire`], [`Error::StateMismatch`] on a forged redirect
    /// (no token call is made) and [`Error::AuthExchangeFailed`] if the
    /// provider rejects the code.
    #[tracing::instrument(skip_all)]
    pub async fn complete(
        &self,
        session: &mut AuthorizationSession,
        input: &OperatorInput,
    ) -> Result<AuthenticatedHandle, Error> {
        let pending = session.take_pending().context(error::NoPendingAuthorizationSnafu)?;
        let code = pending.verify(input).inspect_err(|err| {
            tracing::warn!(error = %err, "Rejected authorization response");
        })?;

        let grant =
            self.tokens.exchange_code(pending.client(), code, pending.redirect_uri()).await?;
        self.store.save(&grant)?;

        tracing::info!("Gmail authorization completed");
        Ok(AuthenticatedHandle::from_grant(&grant))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::{
        matchers::{any, body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::{
        authorization::tests::client_configuration, grant::tests::grant_expiring_at,
        RedirectTarget, MAIL_SEND_SCOPE,
    };

    struct Fixture {
        server: MockServer,
        directory: TempDir,
    }

    impl Fixture {
        async fn start() -> Self {
            Self { server: MockServer::start().await, directory: tempfile::tempdir().unwrap() }
        }

        fn grant_path(&self) -> PathBuf { self.directory.path().join("gmail-grant.json") }

        fn store(&self) -> GrantStore { GrantStore::new(None, Some(self.grant_path())) }

        fn seed(&self, mut grant: AuthorizationGrant) {
            grant.token_endpoint = Url::parse(&format!("{}/token", self.server.uri())).unwrap();
            self.store().save(&grant).unwrap();
        }

        fn manager(&self, client: Option<ClientConfiguration>) -> CredentialManager {
            CredentialManager::with_plaintext_endpoints(client, self.store())
        }

        fn manager_with_secret(
            &self,
            mut secret: AuthorizationGrant,
            client: Option<ClientConfiguration>,
        ) -> CredentialManager {
            secret.token_endpoint = Url::parse(&format!("{}/token", self.server.uri())).unwrap();
            let store = GrantStore::new(Some(secret.to_json().unwrap()), Some(self.grant_path()));
            CredentialManager::with_plaintext_endpoints(client, store)
        }

        fn client(&self) -> ClientConfiguration { client_configuration(&self.server.uri()) }
    }

    fn session() -> AuthorizationSession { AuthorizationSession::new(RedirectTarget::OutOfBand) }

    fn state_of(url: &Url) -> String {
        url.query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_grant_needs_no_network() {
        let fixture = Fixture::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&fixture.server)
            .await;
        fixture.seed(grant_expiring_at(Some(Utc::now() + Duration::hours(1))));
        let manager = fixture.manager(Some(fixture.client()));
        let mut session = session();

        let Acquisition::Ready(first) = manager.acquire(&mut session).await.unwrap() else {
            panic!("expected a ready credential");
        };
        let Acquisition::Ready(second) = manager.acquire(&mut session).await.unwrap() else {
            panic!("expected a ready credential");
        };

        assert_eq!(first, second);
        assert_eq!(first.access_token(), "ya29.cached-access-token");
        assert_eq!(first.account(), AUTHORIZED_ACCOUNT);
        assert!(session.pending().is_none());
    }

    #[tokio::test]
    async fn test_expired_grant_is_refreshed_once_and_persisted() {
        let fixture = Fixture::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.refreshed",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&fixture.server)
            .await;
        fixture.seed(grant_expiring_at(Some(Utc::now() - Duration::minutes(5))));
        let manager = fixture.manager(None);

        let Acquisition::Ready(handle) = manager.acquire(&mut session()).await.unwrap() else {
            panic!("expected a refreshed credential");
        };

        assert_eq!(handle.access_token(), "ya29.refreshed");
        let stored = manager.cached_grant().unwrap();
        assert_eq!(stored.access_token, "ya29.refreshed");
        assert_eq!(stored.refresh_token.as_deref(), Some("1//refresh-token"));
        assert_eq!(assess(&stored, Utc::now()), GrantStatus::Valid);
    }

    #[tokio::test]
    async fn test_rejected_refresh_falls_back_to_interactive() {
        let fixture = Fixture::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })),
            )
            .expect(1)
            .mount(&fixture.server)
            .await;
        fixture.seed(grant_expiring_at(Some(Utc::now() - Duration::minutes(5))));
        let manager = fixture.manager(Some(fixture.client()));
        let mut session = session();

        let acquisition = manager.acquire(&mut session).await.unwrap();

        let Acquisition::NeedsAuthorizationUrl(url) = acquisition else {
            panic!("expected interactive authorization");
        };
        assert_eq!(url.path(), "/o/oauth2/auth");
        let pending_url = session.pending().map(PendingAuthorizationRequest::authorization_url);
        assert_eq!(pending_url, Some(&url));
    }

    #[tokio::test]
    async fn test_unusable_grant_reuses_its_registration() {
        let fixture = Fixture::start().await;
        let mut grant = grant_expiring_at(Some(Utc::now() - Duration::minutes(5)));
        grant.refresh_token = None;
        fixture.seed(grant);
        let manager = fixture.manager(None);

        let acquisition = manager.acquire(&mut session()).await.unwrap();

        let Acquisition::NeedsAuthorizationUrl(url) = acquisition else {
            panic!("expected interactive authorization");
        };
        assert!(url.as_str().starts_with(crate::DEFAULT_AUTHORIZATION_ENDPOINT));
    }

    #[tokio::test]
    async fn test_missing_configuration_yields_no_url() {
        let fixture = Fixture::start().await;
        let manager = fixture.manager(None);
        let mut session = session();

        let result = manager.acquire(&mut session).await;

        assert!(matches!(result, Err(Error::ConfigurationMissing { .. })));
        assert!(session.pending().is_none());
    }

    #[tokio::test]
    async fn test_forged_state_makes_no_token_call() {
        let fixture = Fixture::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&fixture.server)
            .await;
        let manager = fixture.manager(Some(fixture.client()));
        let mut session = session();
        let _url = manager.acquire(&mut session).await.unwrap();

        let input = OperatorInput::Redirect {
            code: Some("4/0AbCd".to_string()),
            state: Some("forged".to_string()),
            error: None,
        };
        let result = manager.complete(&mut session, &input).await;

        assert!(matches!(result, Err(Error::StateMismatch)));
        assert!(session.pending().is_none());
        assert!(manager.cached_grant().is_none());
    }

    #[tokio::test]
    async fn test_matching_state_completes_authorization() {
        let fixture = Fixture::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=4%2F0AbCd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.issued",
                "expires_in": 3599,
                "refresh_token": "1//issued",
                "scope": MAIL_SEND_SCOPE
            })))
            .expect(1)
            .mount(&fixture.server)
            .await;
        let manager = fixture.manager(Some(fixture.client()));
        let mut session = session();

        let Acquisition::NeedsAuthorizationUrl(url) = manager.acquire(&mut session).await.unwrap()
        else {
            panic!("expected interactive authorization");
        };
        let input = OperatorInput::Redirect {
            code: Some("4/0AbCd".to_string()),
            state: Some(state_of(&url)),
            error: None,
        };
        let handle = manager.complete(&mut session, &input).await.unwrap();

        assert_eq!(handle.access_token(), "ya29.issued");
        assert!(session.pending().is_none());
        assert_eq!(manager.cached_grant().unwrap().refresh_token.as_deref(), Some("1//issued"));

        let Acquisition::Ready(again) = manager.acquire(&mut session).await.unwrap() else {
            panic!("expected the persisted grant to be valid");
        };
        assert_eq!(again, handle);
    }

    #[tokio::test]
    async fn test_rejected_code_clears_pending_request() {
        let fixture = Fixture::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({
                    "error": "invalid_grant",
                    "error_description": "Malformed auth code."
                })),
            )
            .expect(1)
            .mount(&fixture.server)
            .await;
        let manager = fixture.manager(Some(fixture.client()));
        let mut session = session();
        let _url = manager.acquire(&mut session).await.unwrap();

        let input = OperatorInput::Code("bogus".to_string());
        let result = manager.complete(&mut session, &input).await;

        assert!(matches!(result, Err(Error::AuthExchangeFailed { .. })));
        assert!(session.pending().is_none());
    }

    #[tokio::test]
    async fn test_complete_without_acquire_is_rejected() {
        let fixture = Fixture::start().await;
        let manager = fixture.manager(Some(fixture.client()));

        let input = OperatorInput::Code("code".to_string());
        let result = manager.complete(&mut session(), &input).await;

        assert!(matches!(result, Err(Error::NoPendingAuthorization)));
    }

    #[tokio::test]
    async fn test_acquire_discards_abandoned_request() {
        let fixture = Fixture::start().await;
        let manager = fixture.manager(Some(fixture.client()));
        let mut session = session();

        let Acquisition::NeedsAuthorizationUrl(first) = manager.acquire(&mut session).await.unwrap()
        else {
            panic!("expected interactive authorization");
        };
        let Acquisition::NeedsAuthorizationUrl(second) =
            manager.acquire(&mut session).await.unwrap()
        else {
            panic!("expected interactive authorization");
        };

        assert_ne!(state_of(&first), state_of(&second));
        let stale = OperatorInput::Redirect {
            code: Some("code".to_string()),
            state: Some(state_of(&first)),
            error: None,
        };
        assert!(matches!(manager.complete(&mut session, &stale).await, Err(Error::StateMismatch)));
    }

    #[tokio::test]
    async fn test_grant_issued_over_stale_secret_is_used() {
        let fixture = Fixture::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.issued",
                "expires_in": 3599,
                "refresh_token": "1//issued",
                "scope": MAIL_SEND_SCOPE
            })))
            .expect(1)
            .mount(&fixture.server)
            .await;
        let mut revoked = grant_expiring_at(Some(Utc::now() - Duration::hours(1)));
        revoked.refresh_token = None;
        let manager = fixture.manager_with_secret(revoked.clone(), Some(fixture.client()));
        let mut session = session();

        let Acquisition::NeedsAuthorizationUrl(url) = manager.acquire(&mut session).await.unwrap()
        else {
            panic!("expected interactive authorization");
        };
        let input = OperatorInput::Redirect {
            code: Some("4/0AbCd".to_string()),
            state: Some(state_of(&url)),
            error: None,
        };
        let _handle = manager.complete(&mut session, &input).await.unwrap();

        let Acquisition::Ready(handle) = manager.acquire(&mut session).await.unwrap() else {
            panic!("expected the issued grant to be used");
        };
        assert_eq!(handle.access_token(), "ya29.issued");
        assert_eq!(manager.cached_grant().unwrap().access_token, "ya29.issued");

        let restarted = fixture.manager_with_secret(revoked, Some(fixture.client()));
        let Acquisition::Ready(handle) = restarted.acquire(&mut session).await.unwrap() else {
            panic!("expected the persisted grant to outrank the stale secret");
        };
        assert_eq!(handle.access_token(), "ya29.issued");
        assert_eq!(restarted.cached_grant().unwrap().access_token, "ya29.issued");
    }

    #[tokio::test]
    async fn test_refreshed_secret_grant_is_not_refreshed_again() {
        let fixture = Fixture::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.refreshed",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&fixture.server)
            .await;
        let expired = grant_expiring_at(Some(Utc::now() - Duration::minutes(5)));
        let manager = fixture.manager_with_secret(expired.clone(), None);
        let mut session = session();

        for _ in 0..2 {
            let Acquisition::Ready(handle) = manager.acquire(&mut session).await.unwrap() else {
                panic!("expected a refreshed credential");
            };
            assert_eq!(handle.access_token(), "ya29.refreshed");
        }

        let restarted = fixture.manager_with_secret(expired, None);
        let Acquisition::Ready(handle) = restarted.acquire(&mut session).await.unwrap() else {
            panic!("expected the persisted refresh to be reused");
        };
        assert_eq!(handle.access_token(), "ya29.refreshed");
    }
}
