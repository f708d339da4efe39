// records shared between the assistant and the CLI

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Local};

/// Width of the separator line closing every logged exchange.
pub const SEPARATOR_WIDTH: usize = 50;

/// One question and its answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchange {
    pub asked_at: DateTime<Local>,
    pub question: String,
    pub answer: String,
}

impl Exchange {
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { asked_at: Local::now(), question: question.into(), answer: answer.into() }
    }

    /// Name of the file holding only this exchange.
    #[must_use]
    pub fn file_name(&self) -> String { format!("{}.txt", self.file_stem()) }

    /// Name used when `file_name` is taken by an exchange asked in the same
    /// second. `attempt` starts at 1.
    #[must_use]
    pub fn numbered_file_name(&self, attempt: u32) -> String {
        format!("{}_{attempt}.txt", self.file_stem())
    }

    fn file_stem(&self) -> String { format!("chat_{}", self.asked_at.format("%Y%m%d_%H%M%S")) }
}

impl Display for Exchange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time: {}", self.asked_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Question: {}", self.question)?;
        writeln!(f, "Answer: {}", self.answer)?;
        writeln!(f, "{}", "-".repeat(SEPARATOR_WIDTH))
    }
}
