pub mod config;

use std::{
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const PROJECT_NAME: &str = "openvpnas-exporter";
pub const PROJECT_NAME_WITH_INITIAL_CAPITAL: &str = "OpenVPN AS Exporter";

pub const PROGRAM_NAME: &str = "openvpnas-exporter";
pub const CONFIG_NAME: &str = "openvpnas-exporter.yaml";

/// Prefix shared by every exported metric name.
pub const METRICS_NAMESPACE: &str = "openvpnas";

pub const DEFAULT_METRICS_PORT: u16 = 9176;
pub const DEFAULT_METRICS_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";

pub const DEFAULT_XMLRPC_SOCKET_PATH: &str = "/usr/local/openvpn_as/etc/sock/sagent.localroot";
pub const DEFAULT_XMLRPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_XMLRPC_CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub static PROJECT_CONFIG_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    ProjectDirs::from("", PROJECT_NAME, PROJECT_NAME)
        .expect("Creating `ProjectDirs` should always success")
        .config_dir()
        .to_path_buf()
});

#[must_use]
pub fn fallback_project_config_directories() -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(2);
    if let Some(user_dirs) = directories::UserDirs::new() {
        candidates.push(
            [user_dirs.home_dir(), Path::new(".config"), Path::new(PROJECT_NAME)].iter().collect(),
        );
    }
    candidates.push([Path::new("/"), Path::new("etc"), Path::new(PROJECT_NAME)].iter().collect());
    candidates
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub version: String,
    pub branch: String,
    pub commit_hash: String,
    pub xmlrpc_socket_path: PathBuf,
    pub start_time: DateTime<Utc>,
}
