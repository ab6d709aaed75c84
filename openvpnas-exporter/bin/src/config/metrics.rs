use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "MetricsConfig::default_host")]
    pub host: IpAddr,

    #[serde(default = "MetricsConfig::default_port")]
    pub port: u16,

    #[serde(default = "MetricsConfig::default_telemetry_path")]
    pub telemetry_path: String,
}

impl MetricsConfig {
    #[inline]
    pub const fn socket_address(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }

    #[inline]
    pub const fn default_host() -> IpAddr { openvpnas_exporter_core::DEFAULT_METRICS_HOST }

    #[inline]
    pub const fn default_port() -> u16 { openvpnas_exporter_core::DEFAULT_METRICS_PORT }

    #[inline]
    pub fn default_telemetry_path() -> String {
        openvpnas_exporter_core::DEFAULT_TELEMETRY_PATH.to_string()
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            telemetry_path: Self::default_telemetry_path(),
        }
    }
}

impl From<MetricsConfig> for openvpnas_exporter_core::config::MetricsConfig {
    fn from(config: MetricsConfig) -> Self {
        Self { listen_address: config.socket_address(), telemetry_path: config.telemetry_path }
    }
}
