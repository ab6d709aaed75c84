use std::net::SocketAddr;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Could not bind metrics server on {listen_address}, error: {source}"))]
    BindMetricsServer { listen_address: SocketAddr, source: std::io::Error },

    #[snafu(display("Metrics server on {listen_address} stopped unexpectedly, error: {source}"))]
    ServeMetricsServer { listen_address: SocketAddr, source: std::io::Error },

    #[snafu(display("Could not encode metric families, error: {source}"))]
    EncodeMetricFamilies { source: prometheus::Error },
}
