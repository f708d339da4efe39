mod chat_log;
mod completion;
mod documents;
mod error;
mod prompt;

use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

use ama_bot_core::{config::AssistantConfig, model::Exchange};
use ama_credential::AuthenticatedHandle;
use notification::NotificationClient;
use snafu::ensure;

pub use self::{
    chat_log::ChatLog,
    completion::CompletionClient,
    documents::Documents,
    error::{Error, Result},
    prompt::{render_system_prompt, DEFAULT_SYSTEM_PROMPT_TEMPLATE},
};

const SUBJECT_QUESTION_CHARS: usize = 60;

/// Something that went wrong without failing the ask workflow.
#[derive(Debug)]
pub enum Warning {
    /// The completion API failed and the fallback answer was used.
    CompletionUnavailable(Error),
    /// The exchange was logged but not emailed.
    NotificationNotSent(notification::Error),
    /// Notifications are configured but no usable credential exists.
    NotificationSkipped(String),
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompletionUnavailable(err) => write!(f, "answered with the fallback: {err}"),
            Self::NotificationNotSent(err) => write!(f, "notification was not sent: {err}"),
            Self::NotificationSkipped(reason) => write!(f, "notification was skipped: {reason}"),
        }
    }
}

/// Result of [`Assistant::ask`].
#[derive(Debug)]
pub struct AskOutcome {
    pub exchange: Exchange,
    /// File holding only this exchange.
    pub log_file: PathBuf,
    pub warnings: Vec<Warning>,
}

/// Emails a copy of every exchange to the administrator.
pub struct ExchangeNotifier {
    client: Box<dyn NotificationClient>,
    credential: AuthenticatedHandle,
    recipient: String,
    subject_prefix: String,
}

impl ExchangeNotifier {
    #[must_use]
    pub fn new(
        client: Box<dyn NotificationClient>,
        credential: AuthenticatedHandle,
        recipient: String,
        subject_prefix: String,
    ) -> Self {
        Self { client, credential, recipient, subject_prefix }
    }

    /// The subject prefix plus the first line of the question, shortened.
    #[must_use]
    pub fn subject(&self, exchange: &Exchange) -> String {
        let first_line = exchange.question.trim().lines().next().unwrap_or_default();
        let mut subject = self.subject_prefix.clone();
        subject.extend(first_line.chars().take(SUBJECT_QUESTION_CHARS));
        if first_line.chars().count() > SUBJECT_QUESTION_CHARS {
            subject.push_str("...");
        }
        subject
    }

    /// # Errors
    ///
    /// Returns the notifier's error unchanged.
    pub async fn notify(
        &self,
        exchange: &Exchange,
    ) -> std::result::Result<(), notification::Error> {
        self.client
            .send(&self.credential, &self.recipient, &self.subject(exchange), &exchange.to_string())
            .await
    }
}

impl fmt::Debug for ExchangeNotifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeNotifier")
            .field("credential", &self.credential)
            .field("recipient", &self.recipient)
            .field("subject_prefix", &self.subject_prefix)
            .finish_non_exhaustive()
    }
}

/// The ask workflow: answer from the documents, log, then notify.
#[derive(Debug)]
pub struct Assistant {
    system_prompt: String,
    completion: CompletionClient,
    fallback_answer: String,
    chat_log: ChatLog,
    notifier: Option<ExchangeNotifier>,
}

impl Assistant {
    /// Loads the documents and prepares the completion client.
    ///
    /// # Errors
    ///
    /// Returns an error if a document is missing or empty, or the completion
    /// client cannot be built.
    pub async fn new(config: AssistantConfig, notifier: Option<ExchangeNotifier>) -> Result<Self> {
        let AssistantConfig { completion, documents, chat_log } = config;

        let loaded = Documents::load(&documents).await?;
        let system_prompt = render_system_prompt(&documents.system_prompt_template, &loaded);
        let fallback_answer = completion.fallback_answer.clone();

        Ok(Self {
            system_prompt,
            completion: CompletionClient::new(completion)?,
            fallback_answer,
            chat_log: ChatLog::new(chat_log.directory),
            notifier,
        })
    }

    #[must_use]
    pub const fn chat_log(&self) -> &ChatLog { &self.chat_log }

    /// Answers `question`, records the exchange and, when a notifier is set,
    /// emails a copy. Completion and notification failures become warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the question is empty or the exchange cannot be
    /// logged.
    #[tracing::instrument(skip_all)]
    pub async fn ask(&self, question: &str) -> Result<AskOutcome> {
        let question = question.trim();
        ensure!(!question.is_empty(), error::EmptyQuestionSnafu);

        let mut warnings = Vec::new();
        let answer = match self.completion.complete(&self.system_prompt, question).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(error = %err, "Completion failed, using the fallback answer");
                warnings.push(Warning::CompletionUnavailable(err));
                self.fallback_answer.clone()
            }
        };

        let exchange = Exchange::new(question, answer);
        let log_file = self.chat_log.record(&exchange).await?;

        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier.notify(&exchange).await {
                tracing::warn!(error = %err, "Could not email the exchange");
                warnings.push(Warning::NotificationNotSent(err));
            }
        }

        Ok(AskOutcome { exchange, log_file, warnings })
    }
}
