use snafu::Snafu;
use url::Url;

/// Errors that can occur in the notification crate.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The recipient is not a valid mailbox.
    #[snafu(display("Invalid recipient address `{address}`: {source}"))]
    InvalidRecipient {
        address: String,
        /// The underlying address error.
        source: lettre::address::AddressError,
    },

    /// The API endpoint is not served over TLS.
    #[snafu(display("Gmail API endpoint {url} must use https"))]
    InsecureEndpoint { url: Url },

    /// The send endpoint could not be derived from the API endpoint.
    #[snafu(display("Could not build Gmail send endpoint: {source}"))]
    BuildSendEndpoint { source: url::ParseError },

    /// Failed to create HTTP client.
    #[snafu(display("Failed to create HTTP client: {source}"))]
    BuildHttpClient {
        /// The underlying reqwest error.
        source: reqwest::Error,
    },

    /// The provider or the transport did not accept the message.
    #[snafu(display("Failed to send email: {detail}"))]
    SendFailed {
        /// HTTP status, absent for transport errors.
        status: Option<u16>,
        /// The provider's error message, or the transport error.
        detail: String,
    },
}
