use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

/// Location of the Access Server agent socket and the deadlines applied to it.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct XmlRpcConfig {
    #[serde(default = "XmlRpcConfig::default_socket_path")]
    pub socket_path: PathBuf,

    /// Seconds allowed for opening the socket and the HTTP handshake.
    #[serde(default = "XmlRpcConfig::default_connect_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub connect_timeout: Duration,

    /// Seconds allowed for each remote call.
    #[serde(default = "XmlRpcConfig::default_call_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub call_timeout: Duration,
}

impl XmlRpcConfig {
    #[inline]
    pub fn default_socket_path() -> PathBuf {
        PathBuf::from(openvpnas_exporter_core::DEFAULT_XMLRPC_SOCKET_PATH)
    }

    #[inline]
    pub const fn default_connect_timeout() -> Duration {
        openvpnas_exporter_core::DEFAULT_XMLRPC_CONNECT_TIMEOUT
    }

    #[inline]
    pub const fn default_call_timeout() -> Duration {
        openvpnas_exporter_core::DEFAULT_XMLRPC_CALL_TIMEOUT
    }
}

impl Default for XmlRpcConfig {
    fn default() -> Self {
        Self {
            socket_path: Self::default_socket_path(),
            connect_timeout: Self::default_connect_timeout(),
            call_timeout: Self::default_call_timeout(),
        }
    }
}

impl From<XmlRpcConfig> for openvpnas_exporter_core::config::XmlRpcConfig {
    fn from(XmlRpcConfig { socket_path, connect_timeout, call_timeout }: XmlRpcConfig) -> Self {
        Self { socket_path, connect_timeout, call_timeout }
    }
}
