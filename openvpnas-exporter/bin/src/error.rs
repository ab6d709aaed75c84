use std::path::PathBuf;

use snafu::Snafu;

use crate::config;

/// Result type alias for the CLI.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for the CLI.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"))]
    Application { source: openvpnas_exporter_server::Error },

    #[snafu(display("Could not initialize tokio runtime, error: {source}"))]
    InitializeTokioRuntime { source: tokio::io::Error },

    #[snafu(display("{source}"))]
    Config { source: config::Error },

    #[snafu(display("Could not serialize configuration, error: {source}"))]
    SerializeConfig { source: serde_yaml::Error },

    #[snafu(display("Could not write to stdout, error: {source}"))]
    WriteStdout { source: std::io::Error },

    #[snafu(display("Scraping XML-RPC endpoint {} failed", socket_path.display()))]
    ScrapeFailed { socket_path: PathBuf },
}

impl From<config::Error> for Error {
    fn from(source: config::Error) -> Self { Self::Config { source } }
}

impl From<openvpnas_exporter_server::Error> for Error {
    fn from(source: openvpnas_exporter_server::Error) -> Self { Self::Application { source } }
}

pub trait CommandError {
    fn exit_code(&self) -> exitcode::ExitCode;
}

impl CommandError for Error {
    fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            Self::Application { .. } | Self::SerializeConfig { .. } => exitcode::SOFTWARE,
            Self::Config { .. } => exitcode::CONFIG,
            Self::InitializeTokioRuntime { .. } | Self::WriteStdout { .. } => exitcode::IOERR,
            Self::ScrapeFailed { .. } => exitcode::UNAVAILABLE,
        }
    }
}
