use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Clone, Debug)]
pub struct Config {
    pub metrics: MetricsConfig,

    pub xmlrpc: XmlRpcConfig,
}

#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub listen_address: SocketAddr,

    pub telemetry_path: String,
}

#[derive(Clone, Debug)]
pub struct XmlRpcConfig {
    /// Unix domain socket of the Access Server agent.
    pub socket_path: PathBuf,

    pub connect_timeout: Duration,

    /// Deadline applied to each remote call separately.
    pub call_timeout: Duration,
}
