use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use lettre::message::{
    header::{self, HeaderName, HeaderValue, Headers},
    Mailbox, Mailboxes, SinglePart,
};
use snafu::ResultExt;

use crate::error::{self, Error};

/// Sender the provider replaces with the authorizing account.
pub const SENDER: &str = "me";

/// One plain-text email, built per send and never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutboundMessage {
    #[must_use]
    pub fn new(to: &str, subject: &str, body: &str) -> Self {
        Self { to: to.to_string(), subject: subject.to_string(), body: body.to_string() }
    }

    #[must_use]
    pub const fn sender(&self) -> &'static str { SENDER }

    /// Renders the RFC 5322 message. The body is UTF-8 text in base64
    /// transfer encoding, so any line breaks and characters survive transit.
    ///
    /// # Errors
    ///
    /// Returns an error if `to` is not a valid mailbox.
    pub fn to_mime(&self) -> Result<Vec<u8>, Error> {
        let recipient: Mailbox = self
            .to
            .trim()
            .parse()
            .context(error::InvalidRecipientSnafu { address: self.to.clone() })?;

        let mut headers = Headers::new();
        headers.insert_raw(HeaderValue::new(
            HeaderName::new_from_ascii_str("From"),
            SENDER.to_string(),
        ));
        headers.set(header::To::from(Mailboxes::from(recipient)));
        headers.set(header::Subject::from(self.subject.clone()));
        headers.set(header::MIME_VERSION_1_0);

        let body = SinglePart::builder()
            .header(header::ContentType::TEXT_PLAIN)
            .header(header::ContentTransferEncoding::Base64)
            .body(self.body.clone());

        let mut mime = headers.to_string().into_bytes();
        mime.extend(body.formatted());
        Ok(mime)
    }

    /// The `raw` field of a send request: base64url without padding.
    ///
    /// # Errors
    ///
    /// Returns an error if `to` is not a valid mailbox.
    pub fn to_raw(&self) -> Result<String, Error> { Ok(URL_SAFE_NO_PAD.encode(self.to_mime()?)) }
}

#[cfg(test)]
pub(crate) mod tests {
    use base64::engine::general_purpose::STANDARD;

    use super::*;

    /// Decodes the base64 body of a rendered message.
    pub(crate) fn decoded_body(mime: &str) -> String {
        let (headers, body) = mime.split_once("\r\n\r\n").unwrap();
        assert!(headers.contains("Content-Transfer-Encoding: base64"));
        let encoded: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap().replace("\r\n", "\n")
    }

    #[test]
    fn test_mime_carries_headers_and_body() {
        let message = OutboundMessage::new(
            "admin@example.com",
            "New AMA question",
            "Question: What do you do?\nAnswer: I build things.",
        );

        let mime = String::from_utf8(message.to_mime().unwrap()).unwrap();

        assert!(mime.contains("From: me\r\n"));
        assert!(mime.contains("To: admin@example.com\r\n"));
        assert!(mime.contains("Subject: New AMA question\r\n"));
        assert!(mime.contains("MIME-Version: 1.0\r\n"));
        assert!(mime.contains("Content-Type: text/plain; charset=utf-8"));
        assert_eq!(decoded_body(&mime), "Question: What do you do?\nAnswer: I build things.");
    }

    #[test]
    fn test_multiline_unicode_body_survives_encoding() {
        let body = "Question: Où avez-vous étudié ?\n\nAnswer: À Zürich, 東京 et São Paulo ✓\n\
                    Une ligne assez longue pour dépasser soixante-seize caractères une fois \
                    encodée en base64.";
        let message = OutboundMessage::new("admin@example.com", "Résumé question", body);

        let mime = String::from_utf8(message.to_mime().unwrap()).unwrap();

        assert!(mime.is_ascii());
        assert_eq!(decoded_body(&mime), body);
    }

    #[test]
    fn test_raw_is_unpadded_base64url() {
        let message = OutboundMessage::new("admin@example.com", "Hi?", "Body>>>???");

        let raw = message.to_raw().unwrap();

        assert!(!raw.contains('='));
        assert!(!raw.contains('+'));
        assert!(!raw.contains('/'));
        assert_eq!(URL_SAFE_NO_PAD.decode(raw).unwrap(), message.to_mime().unwrap());
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let result = OutboundMessage::new("not-an-address", "subject", "body").to_mime();

        assert!(matches!(result, Err(Error::InvalidRecipient { .. })));
    }
}
