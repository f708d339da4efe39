use std::{
    convert::Infallible,
    fmt::{self, Display, Formatter},
    fs::OpenOptions,
    path::PathBuf,
    str::FromStr,
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use snafu::{ResultExt, Snafu};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
    Layer,
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Could not open log file {}, error: {source}", path.display()))]
    OpenLogFile { path: PathBuf, source: std::io::Error },

    #[snafu(display("Could not connect to journald, error: {source}"))]
    ConnectJournald { source: std::io::Error },

    #[snafu(display("Could not install global log subscriber, error: {source}"))]
    InstallSubscriber { source: tracing_subscriber::util::TryInitError },
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_filters")]
    pub filters: String,

    #[serde(default = "LogConfig::default_formatter")]
    #[serde_as(as = "DisplayFromStr")]
    pub formatter: LogFormatter,

    #[serde(default)]
    pub sinks: LogSinks,

    // Emit a line with busy/idle time whenever an instrumented span closes
    #[serde(default)]
    pub show_span_latency: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filters: Self::default_filters(),
            formatter: Self::default_formatter(),
            sinks: LogSinks::default(),
            show_span_latency: false,
        }
    }
}

// SAFETY: every sink is an independent on/off switch.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LogSinks {
    #[serde(default)]
    pub stdout: bool,

    // stdout carries command output, so diagnostics go to stderr by default
    #[serde(default = "LogSinks::default_stderr")]
    pub stderr: bool,

    #[serde(default)]
    pub journald: bool,

    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogSinks {
    fn default() -> Self {
        Self { stdout: false, stderr: Self::default_stderr(), journald: false, file: None }
    }
}

impl LogSinks {
    #[inline]
    #[must_use]
    pub const fn default_stderr() -> bool { true }
}

impl LogConfig {
    #[inline]
    #[must_use]
    pub fn default_filters() -> String {
        "info,ama_bot=info,ama_credential=info,notification=info".to_string()
    }

    #[inline]
    #[must_use]
    pub const fn default_formatter() -> LogFormatter { LogFormatter::Pretty }

    /// Installs the global `tracing` subscriber described by this
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened, journald is
    /// unreachable or a global subscriber is already installed.
    pub fn install(&self) -> Result<(), Error> {
        let Self { filters, formatter, sinks, show_span_latency } = self;

        let filter_layer = tracing_subscriber::filter::EnvFilter::new(filters.as_str());
        let span_events = if *show_span_latency { FmtSpan::CLOSE } else { FmtSpan::NONE };

        let file_layer = sinks
            .file
            .as_ref()
            .map(|path| Sink::File(path.clone()).layer(formatter, span_events.clone()))
            .transpose()?;
        let journald_layer = sinks
            .journald
            .then(|| Sink::Journald.layer(formatter, span_events.clone()))
            .transpose()?;
        let stdout_layer = sinks
            .stdout
            .then(|| Sink::Stdout.layer(formatter, span_events.clone()))
            .transpose()?;
        let stderr_layer =
            sinks.stderr.then(|| Sink::Stderr.layer(formatter, span_events)).transpose()?;

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(file_layer)
            .with(journald_layer)
            .with(stdout_layer)
            .with(stderr_layer)
            .try_init()
            .context(InstallSubscriberSnafu)
    }
}

enum Sink {
    Stdout,
    Stderr,
    Journald,
    File(PathBuf),
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

impl Sink {
    #[allow(clippy::type_repetition_in_bounds)]
    fn layer<S>(self, formatter: &LogFormatter, span_events: FmtSpan) -> Result<BoxedLayer<S>, Error>
    where
        S: tracing::Subscriber,
        for<'a> S: LookupSpan<'a>,
    {
        let fmt = tracing_subscriber::fmt::layer().with_target(true).with_span_events(span_events);

        let layer = match (self, formatter) {
            (Self::Journald, _) => tracing_journald::layer().context(ConnectJournaldSnafu)?.boxed(),
            (Self::Stdout, LogFormatter::Pretty) => fmt.with_writer(std::io::stdout).pretty().boxed(),
            (Self::Stdout, LogFormatter::Json) => {
                fmt.with_writer(std::io::stdout).json().flatten_event(true).boxed()
            }
            (Self::Stderr, LogFormatter::Pretty) => fmt.with_writer(std::io::stderr).pretty().boxed(),
            (Self::Stderr, LogFormatter::Json) => {
                fmt.with_writer(std::io::stderr).json().flatten_event(true).boxed()
            }
            (Self::File(path), formatter) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .context(OpenLogFileSnafu { path })?;
                let writer = Mutex::new(file);
                match formatter {
                    LogFormatter::Pretty => fmt.with_writer(writer).with_ansi(false).boxed(),
                    LogFormatter::Json => fmt.with_writer(writer).json().flatten_event(true).boxed(),
                }
            }
        };

        Ok(layer)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum LogFormatter {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormatter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            _ => Ok(Self::Pretty),
        }
    }
}

impl Display for LogFormatter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}
