pub mod collector;
pub mod descriptor;
mod error;
pub mod rpc;
pub mod sink;

use std::net::SocketAddr;

use bytes::Bytes;
use futures::{future::BoxFuture, FutureExt};
use openvpnas_exporter_core::{
    config::{Config, MetricsConfig, XmlRpcConfig},
    ServerInfo,
};
use sigfinn::{ExitStatus, LifecycleManager, Shutdown};

pub use self::{
    collector::{Collector, Health},
    error::{Error, Result},
    rpc::UnixSocketConnector,
};
use self::sink::MetricFamilySink;

/// # Errors
/// Returns errors when server fails to start
pub async fn serve_with_shutdown(config: Config, server_info: ServerInfo) -> Result<()> {
    let Config { metrics: MetricsConfig { listen_address, telemetry_path }, xmlrpc } = config;

    tracing::info!(
        "{} {} ({}, {}) querying XML-RPC endpoint {}",
        openvpnas_exporter_core::PROJECT_NAME_WITH_INITIAL_CAPITAL,
        server_info.version,
        server_info.branch,
        server_info.commit_hash,
        server_info.xmlrpc_socket_path.display()
    );

    let collector = Collector::new(UnixSocketConnector::from_config(&xmlrpc));

    let lifecycle_manager = LifecycleManager::<Error>::new();

    let _handle = lifecycle_manager.spawn(
        "Metrics server",
        create_metrics_server_future(listen_address, telemetry_path, collector),
    );

    if let Ok(Err(err)) = lifecycle_manager.serve().await {
        tracing::error!("{err}");
        Err(err)
    } else {
        Ok(())
    }
}

/// Runs a single collection cycle and encodes the result in the Prometheus
/// text format.
///
/// A failed cycle is not an error; it is reported through the `up` sample and
/// the returned [`Health`].
///
/// # Errors
/// Returns an error if the collected metric families cannot be encoded.
pub async fn scrape_once(xmlrpc: &XmlRpcConfig) -> Result<(Health, Bytes)> {
    let collector = Collector::new(UnixSocketConnector::from_config(xmlrpc));

    let mut sink = MetricFamilySink::default();
    let health = collector.collect(&mut sink).await;
    let body = openvpnas_metrics::encode_metric_families(&sink.into_metric_families())?;

    Ok((health, body))
}

fn create_metrics_server_future<Metrics>(
    listen_address: SocketAddr,
    telemetry_path: String,
    metrics: Metrics,
) -> impl FnOnce(Shutdown) -> BoxFuture<'static, ExitStatus<Error>>
where
    Metrics: openvpnas_metrics::Metrics + 'static,
{
    move |signal| {
        async move {
            tracing::info!("Listen metrics endpoint on http://{listen_address}{telemetry_path}");
            let result = openvpnas_metrics::start_metrics_server(
                listen_address,
                &telemetry_path,
                metrics,
                signal,
            )
            .await;
            match result {
                Ok(()) => {
                    tracing::info!("Metrics server is shut down gracefully");
                    ExitStatus::Success
                }
                Err(err) => ExitStatus::FatalError(Error::from(err)),
            }
        }
        .boxed()
    }
}
