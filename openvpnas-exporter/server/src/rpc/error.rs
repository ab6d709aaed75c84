use std::{fmt, path::PathBuf, time::Duration};

use snafu::Snafu;
use tokio::time::error::Elapsed;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Could not connect to XML-RPC endpoint {}, error: {source}", socket_path.display()))]
    Connect { socket_path: PathBuf, source: std::io::Error },

    #[snafu(display(
        "Timed out connecting to XML-RPC endpoint {} after {timeout:?}",
        socket_path.display()
    ))]
    ConnectTimeout { socket_path: PathBuf, timeout: Duration, source: Elapsed },

    #[snafu(display("HTTP handshake with XML-RPC endpoint failed, error: {source}"))]
    Handshake { source: hyper::Error },

    #[snafu(display("Could not build request for `{method}`, error: {source}"))]
    BuildRequest { method: String, source: http::Error },

    #[snafu(display("Could not send request for `{method}`, error: {source}"))]
    SendRequest { method: String, source: hyper::Error },

    #[snafu(display("XML-RPC endpoint answered `{method}` with HTTP status {status}"))]
    HttpStatus { method: String, status: http::StatusCode },

    #[snafu(display("Could not read response of `{method}`, error: {source}"))]
    ReadResponse { method: String, source: hyper::Error },

    #[snafu(display("`{method}` did not complete within {timeout:?}"))]
    CallTimeout { method: String, timeout: Duration, source: Elapsed },

    #[snafu(display("Could not parse XML-RPC response, error: {source}"))]
    ParseXml { source: quick_xml::Error },

    #[snafu(display("Malformed XML-RPC response: {message}"))]
    MalformedResponse { message: String },

    #[snafu(display("XML-RPC fault {code}: {message}"))]
    Fault { code: i64, message: String },

    #[snafu(display("Field `{field}` is missing from XML-RPC response"))]
    MissingField { field: &'static str },

    #[snafu(display("Field `{field}` is a {found}, expected {expected}"))]
    UnexpectedType { field: &'static str, expected: &'static str, found: &'static str },
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. }
            | Self::ConnectTimeout { .. }
            | Self::Handshake { .. }
            | Self::BuildRequest { .. }
            | Self::SendRequest { .. }
            | Self::HttpStatus { .. }
            | Self::ReadResponse { .. }
            | Self::CallTimeout { .. } => ErrorKind::Connection,
            Self::ParseXml { .. }
            | Self::MalformedResponse { .. }
            | Self::MissingField { .. }
            | Self::UnexpectedType { .. } => ErrorKind::Decode,
            Self::Fault { .. } => ErrorKind::RemoteFault,
        }
    }
}

/// Coarse classification of [`Error`]; every kind fails the scrape the same way.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Connection,
    Decode,
    RemoteFault,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Decode => write!(f, "decode"),
            Self::RemoteFault => write!(f, "remote-fault"),
        }
    }
}
