//! Credential management for sending mail through Gmail on behalf of the
//! operator.
//!
//! [`CredentialManager::acquire`] hands out an [`AuthenticatedHandle`] from a
//! cached or refreshed [`AuthorizationGrant`], or starts interactive
//! authorization that [`CredentialManager::complete`] finishes.

mod authorization;
mod client_config;
mod error;
mod grant;
mod loopback;
mod manager;
mod store;
mod token_endpoint;

pub use self::{
    authorization::{
        AuthorizationSession, OperatorInput, PendingAuthorizationRequest, RedirectTarget,
        OUT_OF_BAND_REDIRECT_URI,
    },
    client_config::{ClientConfiguration, DEFAULT_AUTHORIZATION_ENDPOINT},
    error::{Error, ErrorKind},
    grant::{assess, redact, AuthorizationGrant, GrantStatus, EXPIRY_SKEW_SECONDS},
    loopback::LoopbackReceiver,
    manager::{Acquisition, AuthenticatedHandle, CredentialManager, AUTHORIZED_ACCOUNT},
    store::GrantStore,
    token_endpoint::TokenClient,
};

/// The only scope this crate ever requests.
pub const MAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";
