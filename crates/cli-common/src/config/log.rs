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
use tracing_subscriber::{
    fmt::{format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Where and how the exporter writes its logs.
// SAFETY: every output sink is toggled independently.
#[allow(clippy::struct_excessive_bools)]
#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_file_path")]
    pub file_path: Option<PathBuf>,

    #[serde(default = "LogConfig::default_emit_journald")]
    pub emit_journald: bool,

    #[serde(default = "LogConfig::default_emit_stdout")]
    pub emit_stdout: bool,

    #[serde(default = "LogConfig::default_emit_stderr")]
    pub emit_stderr: bool,

    #[serde(default = "LogConfig::default_log_filters")]
    pub log_filters: String,

    #[serde(default = "LogConfig::default_log_formatter")]
    #[serde_as(as = "DisplayFromStr")]
    pub formatter: LogFormatter,

    // Emit span close events carrying `time.busy` and `time.idle`
    #[serde(default = "LogConfig::default_show_fn_latency")]
    pub show_fn_latency: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: Self::default_file_path(),
            emit_journald: Self::default_emit_journald(),
            emit_stdout: Self::default_emit_stdout(),
            emit_stderr: Self::default_emit_stderr(),
            log_filters: Self::default_log_filters(),
            formatter: Self::default_log_formatter(),
            show_fn_latency: Self::default_show_fn_latency(),
        }
    }
}

impl LogConfig {
    #[inline]
    #[must_use]
    pub fn default_log_filters() -> String {
        "info,hyper=warn,openvpnas_exporter_server=info".to_string()
    }

    #[inline]
    #[must_use]
    pub const fn default_file_path() -> Option<PathBuf> { None }

    #[inline]
    #[must_use]
    pub const fn default_emit_journald() -> bool { false }

    #[inline]
    #[must_use]
    pub const fn default_emit_stdout() -> bool { false }

    #[inline]
    #[must_use]
    pub const fn default_emit_stderr() -> bool { true }

    #[inline]
    #[must_use]
    pub const fn default_log_formatter() -> LogFormatter { LogFormatter::Compact }

    #[inline]
    #[must_use]
    pub const fn default_show_fn_latency() -> bool { false }

    /// Installs the global `tracing` subscriber.
    ///
    /// Must be called at most once per process.
    pub fn registry(&self) {
        let filter_layer = tracing_subscriber::filter::EnvFilter::new(self.log_filters.as_str());

        let layers: Vec<BoxedLayer> =
            self.drivers().into_iter().filter_map(LogDriver::layer).collect();

        tracing_subscriber::registry().with(layers).with(filter_layer).init();
    }

    fn span_events(&self) -> FmtSpan {
        if self.show_fn_latency {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn drivers(&self) -> Vec<LogDriver> {
        let Self { file_path, emit_journald, emit_stdout, emit_stderr, formatter, .. } = self;
        let span_events = self.span_events();

        let mut drivers = Vec::with_capacity(4);
        if *emit_journald {
            drivers.push(LogDriver::Journald);
        }
        if let Some(path) = file_path {
            drivers.push(LogDriver::File {
                path: path.clone(),
                formatter: formatter.clone(),
                span_events: span_events.clone(),
            });
        }
        if *emit_stdout {
            drivers.push(LogDriver::Stdout {
                formatter: formatter.clone(),
                span_events: span_events.clone(),
            });
        }
        if *emit_stderr {
            drivers.push(LogDriver::Stderr { formatter: formatter.clone(), span_events });
        }
        drivers
    }
}

#[derive(Clone, Debug)]
enum LogDriver {
    Stdout { formatter: LogFormatter, span_events: FmtSpan },
    Stderr { formatter: LogFormatter, span_events: FmtSpan },
    File { path: PathBuf, formatter: LogFormatter, span_events: FmtSpan },
    Journald,
}

impl LogDriver {
    fn layer(self) -> Option<BoxedLayer> {
        match self {
            Self::Stdout { formatter, span_events } => {
                Some(formatted_layer(std::io::stdout, &formatter, span_events))
            }
            Self::Stderr { formatter, span_events } => {
                Some(formatted_layer(std::io::stderr, &formatter, span_events))
            }
            Self::File { path, formatter, span_events } => {
                // An unwritable log file only disables this driver.
                let file = OpenOptions::new().create(true).append(true).open(path).ok()?;
                Some(formatted_layer(Mutex::new(file), &formatter, span_events))
            }
            Self::Journald => Some(tracing_journald::layer().ok()?.boxed()),
        }
    }
}

fn formatted_layer<W>(writer: W, formatter: &LogFormatter, span_events: FmtSpan) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_span_events(span_events);

    match formatter {
        LogFormatter::Pretty => fmt.pretty().boxed(),
        LogFormatter::Compact => fmt.compact().boxed(),
        LogFormatter::Json => fmt.json().flatten_event(true).boxed(),
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum LogFormatter {
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormatter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Ok(Self::Pretty),
        }
    }
}

impl Display for LogFormatter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::{LogConfig, LogFormatter};

    #[test]
    fn test_formatter_from_str() {
        assert_eq!("JSON".parse::<LogFormatter>().unwrap(), LogFormatter::Json);
        assert_eq!("compact".parse::<LogFormatter>().unwrap(), LogFormatter::Compact);
        assert_eq!("anything".parse::<LogFormatter>().unwrap(), LogFormatter::Pretty);
    }

    #[test]
    fn test_formatter_display_round_trip() {
        for formatter in [LogFormatter::Pretty, LogFormatter::Compact, LogFormatter::Json] {
            assert_eq!(formatter.to_string().parse::<LogFormatter>().unwrap(), formatter);
        }
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: LogConfig = serde_yaml::from_str("emit_stdout: true\nformatter: json\n").unwrap();
        assert!(config.emit_stdout);
        assert!(config.emit_stderr);
        assert_eq!(config.formatter, LogFormatter::Json);
        assert_eq!(config.log_filters, LogConfig::default_log_filters());
        assert_eq!(config.file_path, None);
    }

    #[test]
    fn test_drivers_follow_flags() {
        let config = LogConfig {
            file_path: Some(PathBuf::from("/tmp/exporter.log")),
            emit_journald: true,
            emit_stdout: true,
            emit_stderr: false,
            ..LogConfig::default()
        };
        assert_eq!(config.drivers().len(), 3);
        assert_eq!(LogConfig::default().drivers().len(), 1);
    }
}
