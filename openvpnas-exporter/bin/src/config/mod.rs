mod error;
mod metrics;
mod xmlrpc;

use std::path::{Path, PathBuf};

use openvpnas_cli_common::config::LogConfig;
use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};

pub use self::{error::Error, metrics::MetricsConfig, xmlrpc::XmlRpcConfig};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub xmlrpc: XmlRpcConfig,
}

impl Config {
    #[inline]
    pub fn default_path() -> PathBuf {
        [
            openvpnas_exporter_core::PROJECT_CONFIG_DIR.to_path_buf(),
            PathBuf::from(openvpnas_exporter_core::CONFIG_NAME),
        ]
        .into_iter()
        .collect()
    }

    /// Loads `path`, or the first configuration file found in the fallback
    /// directories, and falls back to defaults when none exists.
    #[inline]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let fallbacks = openvpnas_exporter_core::fallback_project_config_directories()
            .into_iter()
            .map(|dir| dir.join(openvpnas_exporter_core::CONFIG_NAME));

        match std::iter::once(path.as_ref().to_path_buf()).chain(fallbacks).find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut config: Self = {
            let data = std::fs::read_to_string(&path)
                .context(error::OpenConfigSnafu { filename: path.as_ref().to_path_buf() })?;

            serde_yaml::from_str(&data)
                .context(error::ParseConfigSnafu { filename: path.as_ref().to_path_buf() })?
        };

        config.log.file_path = match config.log.file_path.map(|path| {
            path.try_resolve()
                .map(|path| path.to_path_buf())
                .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
        }) {
            Some(Ok(path)) => Some(path),
            Some(Err(err)) => return Err(err),
            None => None,
        };

        config.xmlrpc.socket_path = config
            .xmlrpc
            .socket_path
            .try_resolve()
            .map(|path| path.to_path_buf())
            .with_context(|_| error::ResolveFilePathSnafu {
                file_path: config.xmlrpc.socket_path.clone(),
            })?;

        Ok(config)
    }
}

/// Validates the file configuration and converts it for the server crate.
#[inline]
pub fn load_server_config(
    Config { metrics, xmlrpc, .. }: Config,
) -> Result<openvpnas_exporter_core::config::Config, Error> {
    ensure!(
        metrics.telemetry_path.starts_with('/') && metrics.telemetry_path != "/",
        error::InvalidTelemetryPathSnafu { path: metrics.telemetry_path.clone() }
    );
    ensure!(!xmlrpc.connect_timeout.is_zero(), error::ZeroTimeoutSnafu { field: "connect_timeout" });
    ensure!(!xmlrpc.call_timeout.is_zero(), error::ZeroTimeoutSnafu { field: "call_timeout" });

    Ok(openvpnas_exporter_core::config::Config { metrics: metrics.into(), xmlrpc: xmlrpc.into() })
}
