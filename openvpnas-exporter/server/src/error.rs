use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"))]
    Metrics { source: openvpnas_metrics::Error },
}

impl From<openvpnas_metrics::Error> for Error {
    fn from(source: openvpnas_metrics::Error) -> Self { Self::Metrics { source } }
}
