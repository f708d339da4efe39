use std::{
    fmt::{self, Debug, Formatter},
    net::SocketAddr,
};

use rand::{distributions::Alphanumeric, Rng};
use snafu::{ensure, ResultExt};
use url::{form_urlencoded, Host, Url};

use crate::{
    error::{self, Error},
    grant::redact,
    ClientConfiguration, MAIL_SEND_SCOPE,
};

/// Redirect URI for manual code entry.
pub const OUT_OF_BAND_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

const STATE_LENGTH: usize = 32;

/// Where the provider sends the operator's browser after consent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectTarget {
    /// A listener on this machine. Plain http is accepted here only.
    Loopback(SocketAddr),
    /// A fixed, reachable callback URL; the operator pastes the final URL.
    Hosted(Url),
    /// The provider shows the code and the operator pastes it.
    OutOfBand,
}

impl RedirectTarget {
    /// Creates a loopback target.
    ///
    /// # Errors
    ///
    /// Returns an error if `address` is not a loopback address.
    pub fn loopback(address: SocketAddr) -> Result<Self, Error> {
        ensure!(address.ip().is_loopback(), error::NotLoopbackSnafu { address: address.ip() });
        Ok(Self::Loopback(address))
    }

    /// Creates a hosted callback target.
    ///
    /// # Errors
    ///
    /// Returns an error if `uri` is plain http and does not point at a
    /// loopback host.
    pub fn hosted(uri: Url) -> Result<Self, Error> {
        ensure!(
            uri.scheme() == "https" || is_loopback_host(&uri),
            error::InsecureRedirectSnafu { uri }
        );
        Ok(Self::Hosted(uri))
    }

    #[must_use]
    pub fn redirect_uri(&self) -> String {
        match self {
            Self::Loopback(address) => format!("http://{address}/"),
            Self::Hosted(uri) => uri.to_string(),
            Self::OutOfBand => OUT_OF_BAND_REDIRECT_URI.to_string(),
        }
    }
}

fn is_loopback_host(uri: &Url) -> bool {
    match uri.host() {
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

/// One outstanding interactive authorization attempt.
#[derive(Clone)]
pub struct PendingAuthorizationRequest {
    authorization_url: Url,
    expected_state: String,
    redirect_uri: String,
    client: ClientConfiguration,
}

impl PendingAuthorizationRequest {
    /// Builds the consent URL for the mail-send scope with offline access and
    /// a fresh anti-forgery state.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization endpoint cannot carry query
    /// parameters.
    pub fn new(client: ClientConfiguration, redirect: &RedirectTarget) -> Result<Self, Error> {
        let expected_state = generate_state();
        let redirect_uri = redirect.redirect_uri();

        let authorization_url = Url::parse_with_params(
            client.authorization_endpoint.as_str(),
            &[
                ("response_type", "code"),
                ("client_id", client.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", MAIL_SEND_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", expected_state.as_str()),
            ],
        )
        .context(error::BuildAuthorizationUrlSnafu)?;

        Ok(Self { authorization_url, expected_state, redirect_uri, client })
    }

    #[must_use]
    pub const fn authorization_url(&self) -> &Url { &self.authorization_url }

    #[must_use]
    pub fn redirect_uri(&self) -> &str { &self.redirect_uri }

    #[must_use]
    pub const fn client(&self) -> &ClientConfiguration { &self.client }

    /// Returns the authorization code from operator input after checking the
    /// returned state, if any, against the expected one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateMismatch`] on a forged or stale redirect,
    /// [`Error::AuthExchangeFailed`] when the provider redirected with an
    /// error and [`Error::MissingAuthorizationCode`] when there is no code.
    pub fn verify<'a>(&self, input: &'a OperatorInput) -> Result<&'a str, Error> {
        match input {
            OperatorInput::Code(code) => {
                ensure!(!code.is_empty(), error::MissingAuthorizationCodeSnafu);
                Ok(code.as_str())
            }
            OperatorInput::Redirect { code, state, error: provider_error } => {
                if let Some(state) = state {
                    ensure!(*state == self.expected_state, error::StateMismatchSnafu);
                }
                if let Some(reason) = provider_error {
                    return error::AuthExchangeFailedSnafu {
                        operation: "authorization_code",
                        detail: reason.clone(),
                    }
                    .fail();
                }
                code.as_deref()
                    .filter(|code| !code.is_empty())
                    .ok_or(Error::MissingAuthorizationCode)
            }
        }
    }
}

impl Debug for PendingAuthorizationRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAuthorizationRequest")
            .field("authorization_url", &self.authorization_url.as_str())
            .field("expected_state", &redact(&self.expected_state))
            .field("redirect_uri", &self.redirect_uri)
            .field("client", &self.client)
            .finish()
    }
}

fn generate_state() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(STATE_LENGTH).map(char::from).collect()
}

/// What the operator hands back after consenting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatorInput {
    /// A bare authorization code.
    Code(String),
    /// The query parameters of the URL the provider redirected to.
    Redirect { code: Option<String>, state: Option<String>, error: Option<String> },
}

impl OperatorInput {
    /// Interprets pasted text: anything that parses as an http(s) URL is a
    /// redirect, everything else is a bare code.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::from_redirect_url(&url),
            _ => Self::Code(input.to_string()),
        }
    }

    #[must_use]
    pub fn from_redirect_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }

    /// Reads `code`, `state` and `error` from a URL query string.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }
        Self::Redirect { code, state, error }
    }

    /// Whether a redirect carries anything the provider would send back.
    #[must_use]
    pub const fn is_provider_response(&self) -> bool {
        match self {
            Self::Code(_) => true,
            Self::Redirect { code, error, .. } => code.is_some() || error.is_some(),
        }
    }
}

/// Session-scoped authorization state, owned by the caller and handed to
/// every [`CredentialManager`](crate::CredentialManager) call.
#[derive(Debug)]
pub struct AuthorizationSession {
    redirect: RedirectTarget,
    pending: Option<PendingAuthorizationRequest>,
}

impl AuthorizationSession {
    #[must_use]
    pub const fn new(redirect: RedirectTarget) -> Self { Self { redirect, pending: None } }

    #[must_use]
    pub const fn redirect(&self) -> &RedirectTarget { &self.redirect }

    #[must_use]
    pub const fn pending(&self) -> Option<&PendingAuthorizationRequest> { self.pending.as_ref() }

    pub(crate) fn begin(&mut self, pending: PendingAuthorizationRequest) -> &Url {
        if self.pending.is_some() {
            tracing::info!("Discarding previous pending authorization request");
        }
        &self.pending.insert(pending).authorization_url
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingAuthorizationRequest> {
        self.pending.take()
    }

    pub(crate) fn discard_pending(&mut self) {
        if self.pending.take().is_some() {
            tracing::info!("Discarding abandoned authorization request");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn client_configuration(base: &str) -> ClientConfiguration {
        ClientConfiguration {
            client_id: "client-id.apps.googleusercontent.com".to_string(),
            client_secret: "client-secret".to_string(),
            authorization_endpoint: Url::parse(&format!("{base}/o/oauth2/auth")).unwrap(),
            token_endpoint: Url::parse(&format!("{base}/token")).unwrap(),
            redirect_uris: Vec::new(),
        }
    }

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs().find(|(name, _)| name == key).map(|(_, value)| value.into_owned())
    }

    #[test]
    fn test_authorization_url_requests_offline_mail_send() {
        let redirect = RedirectTarget::loopback("127.0.0.1:8765".parse().unwrap()).unwrap();
        let pending = PendingAuthorizationRequest::new(
            client_configuration("https://accounts.example.com"),
            &redirect,
        )
        .unwrap();
        let url = pending.authorization_url();

        assert_eq!(url.path(), "/o/oauth2/auth");
        assert_eq!(query_value(url, "scope").as_deref(), Some(MAIL_SEND_SCOPE));
        assert_eq!(query_value(url, "access_type").as_deref(), Some("offline"));
        assert_eq!(query_value(url, "response_type").as_deref(), Some("code"));
        assert_eq!(query_value(url, "redirect_uri").as_deref(), Some("http://127.0.0.1:8765/"));
        assert_eq!(query_value(url, "state").map(|state| state.len()), Some(STATE_LENGTH));
    }

    #[test]
    fn test_each_request_gets_a_fresh_state() {
        let client = client_configuration("https://accounts.example.com");
        let first = PendingAuthorizationRequest::new(client.clone(), &RedirectTarget::OutOfBand)
            .unwrap();
        let second = PendingAuthorizationRequest::new(client, &RedirectTarget::OutOfBand).unwrap();

        assert_ne!(first.expected_state, second.expected_state);
        assert_eq!(first.redirect_uri(), OUT_OF_BAND_REDIRECT_URI);
    }

    #[test]
    fn test_redirect_targets_reject_insecure_transport() {
        assert!(matches!(
            RedirectTarget::loopback("10.0.0.5:8080".parse().unwrap()),
            Err(Error::NotLoopback { .. })
        ));
        assert!(matches!(
            RedirectTarget::hosted(Url::parse("http://ama.example.com/callback").unwrap()),
            Err(Error::InsecureRedirect { .. })
        ));
        assert!(RedirectTarget::hosted(Url::parse("https://ama.example.com/callback").unwrap())
            .is_ok());
        assert!(RedirectTarget::hosted(Url::parse("http://localhost:8501/").unwrap()).is_ok());
    }

    #[test]
    fn test_parse_operator_input() {
        assert_eq!(
            OperatorInput::parse("  4/0AbCd  \n"),
            OperatorInput::Code("4/0AbCd".to_string())
        );
        assert_eq!(
            OperatorInput::parse("http://localhost:8501/?state=xyz&code=4/0AbCd&scope=gmail.send"),
            OperatorInput::Redirect {
                code: Some("4/0AbCd".to_string()),
                state: Some("xyz".to_string()),
                error: None,
            }
        );
    }

    #[test]
    fn test_verify_rejects_mismatched_state() {
        let pending = PendingAuthorizationRequest::new(
            client_configuration("https://accounts.example.com"),
            &RedirectTarget::OutOfBand,
        )
        .unwrap();
        let input = OperatorInput::Redirect {
            code: Some("code".to_string()),
            state: Some("forged".to_string()),
            error: None,
        };

        assert!(matches!(pending.verify(&input), Err(Error::StateMismatch)));
    }

    #[test]
    fn test_verify_reports_provider_error() {
        let pending = PendingAuthorizationRequest::new(
            client_configuration("https://accounts.example.com"),
            &RedirectTarget::OutOfBand,
        )
        .unwrap();
        let input = OperatorInput::Redirect {
            code: None,
            state: Some(pending.expected_state.clone()),
            error: Some("access_denied".to_string()),
        };

        assert!(matches!(pending.verify(&input), Err(Error::AuthExchangeFailed { .. })));
        assert!(matches!(
            pending.verify(&OperatorInput::Code(String::new())),
            Err(Error::MissingAuthorizationCode)
        ));
    }

    #[test]
    fn test_session_keeps_one_pending_request() {
        let client = client_configuration("https://accounts.example.com");
        let mut session = AuthorizationSession::new(RedirectTarget::OutOfBand);

        let first = session
            .begin(
                PendingAuthorizationRequest::new(client.clone(), &RedirectTarget::OutOfBand)
                    .unwrap(),
            )
            .clone();
        let second = session
            .begin(PendingAuthorizationRequest::new(client, &RedirectTarget::OutOfBand).unwrap())
            .clone();

        assert_ne!(first, second);
        let pending_url = session.pending().map(PendingAuthorizationRequest::authorization_url);
        assert_eq!(pending_url, Some(&second));

        session.discard_pending();
        assert!(session.pending().is_none());
    }
}
