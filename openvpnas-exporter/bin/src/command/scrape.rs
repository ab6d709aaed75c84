use std::{io, io::Write};

use snafu::{ensure, ResultExt};
use tokio::runtime::Builder;

use crate::{
    config::{load_server_config, Config},
    error,
    error::Result,
};

/// Runs one collection cycle and prints the exposition text to stdout.
///
/// The metrics are printed even when the cycle fails; the failure is then
/// reported through the exit status.
pub fn run_scrape(config: Config) -> Result<()> {
    config.log.registry();

    let openvpnas_exporter_core::config::Config { xmlrpc, .. } = load_server_config(config)?;

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context(error::InitializeTokioRuntimeSnafu)?;
    let (health, body) = runtime.block_on(openvpnas_exporter_server::scrape_once(&xmlrpc))?;

    io::stdout().write_all(&body).context(error::WriteStdoutSnafu)?;

    ensure!(health.is_up(), error::ScrapeFailedSnafu { socket_path: xmlrpc.socket_path.clone() });
    Ok(())
}
