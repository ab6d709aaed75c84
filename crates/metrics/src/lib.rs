pub mod error;
mod server;
mod traits;

pub use self::{
    error::Error,
    server::{encode_metric_families, metrics_router, start_metrics_server},
    traits::Metrics,
};
