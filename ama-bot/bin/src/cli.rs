use std::{io, io::Write, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use snafu::ResultExt;

use crate::{command, config::Config, error, shadow};

#[derive(Debug, Parser)]
#[command(author,
    version,
    long_version = shadow::CLAP_LONG_VERSION,
    about,
    long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(
        long = "config",
        short = 'c',
        env = "AMA_BOT_CONFIG_FILE_PATH",
        help = "Specify a configuration file"
    )]
    config_file_path: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(about = "Print version information")]
    Version,

    #[clap(about = "Output shell completion code for the specified shell (bash, zsh, fish)")]
    Completion { shell: Shell },

    #[clap(about = "Output default configuration")]
    DefaultConfig,

    #[clap(about = "Authorize sending email through Gmail and save the grant")]
    #[command(visible_alias = "auth")]
    Authorize {
        #[arg(long, help = "Paste the code or redirect URL instead of listening on loopback")]
        manual: bool,

        #[arg(long, help = "Print the grant JSON for use as AMA_BOT_GMAIL_TOKEN")]
        print_secret: bool,
    },

    #[clap(about = "Send one email with the saved Gmail credential")]
    Notify {
        #[arg(long, help = "Recipient address, defaults to `notification.admin_recipient`")]
        to: Option<String>,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        body: String,
    },

    #[clap(about = "Ask a question and get an answer from the resume and background")]
    Ask {
        #[arg(required = true, help = "The question, quoted or as separate words")]
        question: Vec<String>,
    },

    #[clap(about = "Print the saved chat history")]
    History,
}

impl Cli {
    pub fn run(self) -> Result<(), Box<error::Error>> {
        match self.command {
            Command::Version => {
                io::stdout()
                    .write_all(Self::command().render_long_version().as_bytes())
                    .context(error::WriteStdoutSnafu)?;
            }
            Command::Completion { shell } => {
                let mut command = Self::command();
                let bin_name = command.get_name().to_string();
                clap_complete::generate(shell, &mut command, bin_name, &mut io::stdout());
            }
            Command::DefaultConfig => {
                let config_text = serde_yaml::to_string(&Config::default())
                    .context(error::SerializeConfigSnafu)?;
                io::stdout().write_all(config_text.as_bytes()).context(error::WriteStdoutSnafu)?;
            }
            Command::Authorize { manual, print_secret } => {
                let config = self.load_config()?;
                command::authorize(&config, manual, print_secret)?;
            }
            Command::Notify { ref to, ref subject, ref body } => {
                let config = self.load_config()?;
                command::notify(&config, to.clone(), subject, body)?;
            }
            Command::Ask { ref question } => {
                let config = self.load_config()?;
                command::ask(&config, &question.join(" "))?;
            }
            Command::History => {
                let config = self.load_config()?;
                command::history(&config)?;
            }
        }

        Ok(())
    }

    #[allow(clippy::result_large_err)]
    fn load_config(&self) -> Result<Config, error::Error> {
        let config_file_path = &self.config_file_path.clone().unwrap_or_else(Config::default_path);
        if self.config_file_path.is_none() && !config_file_path.exists() {
            return Ok(Config::default().resolved()?);
        }
        Ok(Config::load(config_file_path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() { Cli::command().debug_assert(); }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::parse_from(["ama-bot", "ask", "What", "is", "your", "background?"]);

        match cli.command {
            Command::Ask { question } => assert_eq!(question.join(" "), "What is your background?"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_authorize_flags() {
        let cli = Cli::parse_from(["ama-bot", "auth", "--manual"]);

        assert!(matches!(cli.command, Command::Authorize { manual: true, print_secret: false }));
    }
}
