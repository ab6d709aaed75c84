use async_trait::async_trait;

/// A source of metric families, gathered once per scrape.
#[async_trait]
pub trait Metrics: Clone + Send + Sync {
    async fn gather(&self) -> Vec<prometheus::proto::MetricFamily>;
}
