use std::{
    collections::BTreeSet,
    fmt::{self, Debug, Formatter},
};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::MAIL_SEND_SCOPE;

/// Access tokens this close to their expiry are treated as expired.
pub const EXPIRY_SKEW_SECONDS: i64 = 10;

/// An OAuth2 authorization outcome for the mail-send scope.
///
/// Serialized with exactly these field names. `token` and `token_uri` are
/// accepted on read so grants written by the provider's own tooling load
/// unchanged.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizationGrant {
    #[serde(alias = "token", default)]
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(alias = "token_uri")]
    pub token_endpoint: Url,

    pub client_id: String,

    pub client_secret: String,

    #[serde(default)]
    pub scopes: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

/// Result of [`assess`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantStatus {
    /// Usable as is.
    Valid,
    /// Expired or missing an access token, but carries a refresh token.
    Refreshable,
    /// Needs interactive authorization.
    Unusable,
}

/// Decides whether `grant` can be used at `now`.
#[must_use]
pub fn assess(grant: &AuthorizationGrant, now: DateTime<Utc>) -> GrantStatus {
    if !grant.has_mail_send_scope() {
        return GrantStatus::Unusable;
    }

    let skew = Duration::seconds(EXPIRY_SKEW_SECONDS);
    let expired = grant.expiry.is_some_and(|expiry| expiry - skew <= now);
    if !grant.access_token.is_empty() && !expired {
        return GrantStatus::Valid;
    }

    match grant.refresh_token.as_deref() {
        Some(refresh_token) if !refresh_token.is_empty() => GrantStatus::Refreshable,
        _ => GrantStatus::Unusable,
    }
}

impl AuthorizationGrant {
    #[must_use]
    pub fn has_mail_send_scope(&self) -> bool { self.scopes.contains(MAIL_SEND_SCOPE) }

    /// Replaces the access token and expiry after a successful refresh. A
    /// rotated refresh token replaces the stored one.
    pub fn apply_refresh(
        &mut self,
        access_token: String,
        expiry: Option<DateTime<Utc>>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expiry = expiry;
        if let Some(refresh_token) = refresh_token {
            self.refresh_token = Some(refresh_token);
        }
    }

    /// Parses a serialized grant.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a structurally compatible grant.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(json) }

    /// Serializes the grant for a secret store or the grant file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> { serde_json::to_string(self) }
}

impl Debug for AuthorizationGrant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationGrant")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(redact))
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Keeps a short prefix of a secret so log lines stay correlatable.
#[must_use]
pub fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}***")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn grant_expiring_at(expiry: Option<DateTime<Utc>>) -> AuthorizationGrant {
        AuthorizationGrant {
            access_token: "ya29.cached-access-token".to_string(),
            refresh_token: Some("1//refresh-token".to_string()),
            token_endpoint: Url::parse("https://oauth2.googleapis.com/token").unwrap(),
            client_id: "client-id.apps.googleusercontent.com".to_string(),
            client_secret: "client-secret".to_string(),
            scopes: BTreeSet::from([MAIL_SEND_SCOPE.to_string()]),
            expiry,
        }
    }

    #[test]
    fn test_unexpired_grant_is_valid() {
        let now = Utc::now();
        let grant = grant_expiring_at(Some(now + Duration::hours(1)));

        assert_eq!(assess(&grant, now), GrantStatus::Valid);
    }

    #[test]
    fn test_grant_without_expiry_is_valid() {
        let grant = grant_expiring_at(None);

        assert_eq!(assess(&grant, Utc::now()), GrantStatus::Valid);
    }

    #[test]
    fn test_grant_inside_skew_window_is_refreshable() {
        let now = Utc::now();
        let grant = grant_expiring_at(Some(now + Duration::seconds(5)));

        assert_eq!(assess(&grant, now), GrantStatus::Refreshable);
    }

    #[test]
    fn test_expired_grant_without_refresh_token_is_unusable() {
        let now = Utc::now();
        let mut grant = grant_expiring_at(Some(now - Duration::minutes(1)));
        grant.refresh_token = None;
        assert_eq!(assess(&grant, now), GrantStatus::Unusable);

        grant.refresh_token = Some(String::new());
        assert_eq!(assess(&grant, now), GrantStatus::Unusable);
    }

    #[test]
    fn test_empty_access_token_with_refresh_token_is_refreshable() {
        let mut grant = grant_expiring_at(None);
        grant.access_token.clear();

        assert_eq!(assess(&grant, Utc::now()), GrantStatus::Refreshable);
    }

    #[test]
    fn test_grant_without_mail_send_scope_is_unusable() {
        let mut grant = grant_expiring_at(None);
        grant.scopes =
            BTreeSet::from(["https://www.googleapis.com/auth/gmail.readonly".to_string()]);

        assert_eq!(assess(&grant, Utc::now()), GrantStatus::Unusable);
    }

    #[test]
    fn test_parse_grant_written_by_provider_tooling() {
        let json = r#"{
            "token": "ya29.token",
            "refresh_token": "1//refresh",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "id",
            "client_secret": "secret",
            "scopes": ["https://www.googleapis.com/auth/gmail.send"]
        }"#;

        let grant = AuthorizationGrant::from_json(json).unwrap();

        assert_eq!(grant.access_token, "ya29.token");
        assert_eq!(grant.token_endpoint.as_str(), "https://oauth2.googleapis.com/token");
        assert!(grant.has_mail_send_scope());
        assert!(grant.expiry.is_none());
    }

    #[test]
    fn test_serialized_grant_uses_canonical_field_names() {
        let grant = grant_expiring_at(None);
        let value: serde_json::Value = serde_json::from_str(&grant.to_json().unwrap()).unwrap();

        assert!(value.get("access_token").is_some());
        assert!(value.get("token_endpoint").is_some());
        assert!(value.get("token").is_none());
        assert_eq!(AuthorizationGrant::from_json(&grant.to_json().unwrap()).unwrap(), grant);
    }

    #[test]
    fn test_apply_refresh_keeps_refresh_token_unless_rotated() {
        let mut grant = grant_expiring_at(None);
        let expiry = Some(Utc::now() + Duration::hours(1));

        grant.apply_refresh("ya29.second".to_string(), expiry, None);
        assert_eq!(grant.access_token, "ya29.second");
        assert_eq!(grant.refresh_token.as_deref(), Some("1//refresh-token"));
        assert_eq!(grant.expiry, expiry);

        grant.apply_refresh("ya29.third".to_string(), None, Some("1//rotated".to_string()));
        assert_eq!(grant.refresh_token.as_deref(), Some("1//rotated"));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let rendered = format!("{:?}", grant_expiring_at(None));

        assert!(!rendered.contains("cached-access-token"));
        assert!(!rendered.contains("client-secret"));
        assert!(rendered.contains("ya29***"));
    }
}
