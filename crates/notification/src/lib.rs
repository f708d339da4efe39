//! # Notification Crate
//!
//! This crate sends notifications on behalf of the operator. Currently
//! supports plain-text email through the Gmail API with a user-delegated
//! OAuth2 credential from [`ama_credential`].
//!
//! ## Features
//!
//! - Gmail API integration with the `gmail.send` scope
//! - Plain-text MIME messages sent as the authorizing account
//! - Async/await support

mod error;
pub mod gmail;
mod message;

use ama_credential::AuthenticatedHandle;
use async_trait::async_trait;

pub use self::{
    error::Error,
    message::{OutboundMessage, SENDER},
};

/// Trait for notification clients that can send notifications.
#[async_trait]
pub trait NotificationClient: Send + Sync {
    /// Sends one message. No retries are made.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or the provider does
    /// not accept it.
    async fn send_notification(
        &self,
        credential: &AuthenticatedHandle,
        message: &OutboundMessage,
    ) -> Result<(), Error>;

    /// Formats and sends one plain-text email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecipient`] for a malformed address and
    /// [`Error::SendFailed`] for anything the provider or transport rejects.
    async fn send(
        &self,
        credential: &AuthenticatedHandle,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), Error> {
        self.send_notification(credential, &OutboundMessage::new(to, subject, body)).await
    }
}
