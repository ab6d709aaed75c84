use std::{future::Future, net::SocketAddr};

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing, Router,
};
use bytes::Bytes;
use prometheus::{proto::MetricFamily, Encoder, TextEncoder};
use snafu::ResultExt;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{error, Error, Metrics};

/// Serves `metrics` on `telemetry_path` until `shutdown_signal` resolves.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server stops abnormally.
pub async fn start_metrics_server<M, ShutdownSignal>(
    listen_address: SocketAddr,
    telemetry_path: &str,
    metrics: M,
    shutdown_signal: ShutdownSignal,
) -> Result<(), Error>
where
    M: Metrics + 'static,
    ShutdownSignal: Future<Output = ()> + Send + 'static,
{
    let router = metrics_router(telemetry_path, metrics);

    let listener = TcpListener::bind(&listen_address)
        .await
        .context(error::BindMetricsServerSnafu { listen_address })?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context(error::ServeMetricsServerSnafu { listen_address })
}

/// Builds the exposition router: `telemetry_path` runs a scrape, `/` links to it.
pub fn metrics_router<M>(telemetry_path: &str, metrics: M) -> Router
where
    M: Metrics + 'static,
{
    let landing_page = landing_page(telemetry_path);

    Router::new()
        .route(telemetry_path, routing::get(serve_metrics::<M>))
        .route(
            "/",
            routing::get(move || {
                let landing_page = landing_page.clone();
                async move { Html(landing_page) }
            }),
        )
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

/// Encodes metric families with the Prometheus text format.
///
/// # Errors
/// Returns an error if a metric family is malformed.
pub fn encode_metric_families(metric_families: &[MetricFamily]) -> Result<Bytes, Error> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(metric_families, &mut buffer)
        .context(error::EncodeMetricFamiliesSnafu)?;
    Ok(Bytes::from(buffer))
}

async fn serve_metrics<M>(State(metrics): State<M>) -> Response
where
    M: Metrics,
{
    let metric_families = metrics.gather().await;

    match encode_metric_families(&metric_families) {
        Ok(body) => {
            ([(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())], body)
                .into_response()
        }
        Err(err) => {
            tracing::error!("{err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

// SAFETY: `axum` handler must be async
#[allow(clippy::unused_async)]
async fn fallback(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.to_string())],
        format!("No route for {uri}"),
    )
        .into_response()
}

fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html><head><title>OpenVPN AS Exporter</title></head><body><h1>OpenVPN AS \
         Exporter</h1><p><a href=\"{telemetry_path}\">Metrics</a></p></body></html>"
    )
}
