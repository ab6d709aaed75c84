//! One scrape of the Access Server agent.
//!
//! A cycle opens a fresh session, calls `GetVPNSummary` and then
//! `GetSubscriptionStatus`, and emits samples as each call succeeds. The
//! first failure ends the cycle. Exactly one `up` sample is emitted per
//! cycle and it is always the last one.

mod response;

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::proto::MetricFamily;

pub use self::response::{SubscriptionStatus, VpnSummary};
use crate::{
    descriptor::{Descriptors, MetricKey},
    rpc::{self, Connector},
    sink::{MetricFamilySink, SampleSink},
};

pub const GET_VPN_SUMMARY: &str = "GetVPNSummary";
pub const GET_SUBSCRIPTION_STATUS: &str = "GetSubscriptionStatus";

/// Outcome of one collection cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Health {
    Up,
    Down,
}

impl Health {
    #[must_use]
    pub const fn as_value(self) -> f64 {
        match self {
            Self::Up => 1.0,
            Self::Down => 0.0,
        }
    }

    #[must_use]
    pub const fn is_up(self) -> bool { matches!(self, Self::Up) }
}

#[derive(Clone, Debug)]
pub struct Collector<C> {
    connector: C,

    descriptors: Arc<Descriptors>,
}

impl<C> Collector<C>
where
    C: Connector,
{
    #[must_use]
    pub fn new(connector: C) -> Self { Self::with_descriptors(connector, Descriptors::default()) }

    #[must_use]
    pub fn with_descriptors(connector: C, descriptors: Descriptors) -> Self {
        Self { connector, descriptors: Arc::new(descriptors) }
    }

    #[must_use]
    pub fn descriptors(&self) -> &Descriptors { &self.descriptors }

    /// Runs one collection cycle, emitting every sample into `sink`.
    pub async fn collect<S>(&self, sink: &mut S) -> Health
    where
        S: SampleSink + Send,
    {
        let health = self.collect_inner(sink).await;
        sink.emit(self.descriptors.get(MetricKey::Up), health.as_value());
        health
    }

    // The session is dropped, and the connection closed, on every return path.
    async fn collect_inner<S>(&self, sink: &mut S) -> Health
    where
        S: SampleSink + Send,
    {
        let descriptors = &self.descriptors;

        let mut session = match self.connector.connect().await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(kind = %err.kind(), "Could not open XML-RPC session: {err}");
                return Health::Down;
            }
        };

        let summary =
            match rpc::call_decoded::<VpnSummary, _>(&mut session, GET_VPN_SUMMARY).await {
                Ok(summary) => summary,
                Err(err) => {
                    tracing::warn!(
                        kind = %err.kind(),
                        method = GET_VPN_SUMMARY,
                        "XML-RPC call failed: {err}"
                    );
                    return Health::Down;
                }
            };
        sink.emit(
            descriptors.get(MetricKey::ServerConnectedClients),
            gauge_value(summary.connected_clients),
        );

        let status = match rpc::call_decoded::<SubscriptionStatus, _>(
            &mut session,
            GET_SUBSCRIPTION_STATUS,
        )
        .await
        {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(
                    kind = %err.kind(),
                    method = GET_SUBSCRIPTION_STATUS,
                    "XML-RPC call failed: {err}"
                );
                return Health::Down;
            }
        };
        for (key, value) in [
            (MetricKey::SubscriptionStatusUpdateTime, status.last_successful_update),
            (MetricKey::SubscriptionCurrentClientConnections, status.current_connections),
            (MetricKey::SubscriptionMaximumClientConnections, status.maximum_connections),
            (MetricKey::SubscriptionFallbackClientConnections, status.fallback_connections),
        ] {
            sink.emit(descriptors.get(key), gauge_value(value));
        }

        Health::Up
    }
}

// Values are reported as the agent sends them; exact below 2^53 in magnitude.
#[allow(clippy::cast_precision_loss)]
fn gauge_value(value: i64) -> f64 { value as f64 }

#[async_trait]
impl<C> openvpnas_metrics::Metrics for Collector<C>
where
    C: Connector + Clone + 'static,
{
    async fn gather(&self) -> Vec<MetricFamily> {
        let mut sink = MetricFamilySink::default();
        let health = self.collect(&mut sink).await;
        tracing::debug!("Scrape finished, up: {}", health.as_value());
        sink.into_metric_families()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        path::PathBuf,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };

    use async_trait::async_trait;

    use crate::{
        collector::{Collector, Health, GET_SUBSCRIPTION_STATUS, GET_VPN_SUMMARY},
        descriptor::MetricKey,
        rpc::{Connector, Error, Session, Value},
        sink::Sample,
    };

    type Reply = Result<Value, Error>;

    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        calls: Mutex<Vec<String>>,
        closed: AtomicUsize,
    }

    /// Hands out sessions that answer with scripted replies, keyed by method.
    #[derive(Clone)]
    struct FakeConnector {
        reachable: bool,
        replies: Arc<dyn Fn(&str) -> Reply + Send + Sync>,
        counters: Arc<Counters>,
    }

    impl FakeConnector {
        fn new<F>(replies: F) -> Self
        where
            F: Fn(&str) -> Reply + Send + Sync + 'static,
        {
            Self { reachable: true, replies: Arc::new(replies), counters: Arc::default() }
        }

        fn unreachable() -> Self {
            Self { reachable: false, ..Self::new(|_| unreachable!("no session is opened")) }
        }

        fn calls(&self) -> Vec<String> { self.counters.calls.lock().unwrap().clone() }
    }

    struct FakeSession {
        replies: Arc<dyn Fn(&str) -> Reply + Send + Sync>,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Session = FakeSession;

        async fn connect(&self) -> Result<Self::Session, Error> {
            let _ = self.counters.connects.fetch_add(1, Ordering::SeqCst);
            if !self.reachable {
                return Err(Error::Connect {
                    socket_path: PathBuf::from("/nonexistent/sagent.localroot"),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Ok(FakeSession { replies: self.replies.clone(), counters: self.counters.clone() })
        }
    }

    #[async_trait]
    impl Session for FakeSession {
        async fn call(&mut self, method: &str, params: &[Value]) -> Result<Value, Error> {
            assert!(params.is_empty());
            self.counters.calls.lock().unwrap().push(method.to_string());
            (self.replies)(method)
        }
    }

    impl Drop for FakeSession {
        fn drop(&mut self) { let _ = self.counters.closed.fetch_add(1, Ordering::SeqCst); }
    }

    fn object(members: &[(&str, i64)]) -> Value {
        Value::Struct(
            members
                .iter()
                .map(|(name, value)| ((*name).to_string(), Value::Int(*value)))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn summary(n_clients: i64) -> Reply { Ok(object(&[("n_clients", n_clients)])) }

    fn subscription() -> Reply {
        Ok(object(&[
            ("current_cc", 3),
            ("max_cc", 10),
            ("fallback_cc", 0),
            ("last_successful_update", 1_700_000_000),
            ("cc_limit", 10),
        ]))
    }

    fn healthy(method: &str) -> Reply {
        match method {
            GET_VPN_SUMMARY => summary(7),
            GET_SUBSCRIPTION_STATUS => subscription(),
            other => panic!("unexpected method {other}"),
        }
    }

    fn fault() -> Reply {
        Err(Error::Fault { code: 9000, message: "method not available".to_string() })
    }

    fn sample(key: MetricKey, value: f64) -> Sample { Sample { key, value } }

    #[tokio::test]
    async fn test_successful_cycle() {
        let connector = FakeConnector::new(healthy);
        let collector = Collector::new(connector.clone());

        let mut samples = Vec::new();
        let health = collector.collect(&mut samples).await;

        assert_eq!(health, Health::Up);
        assert_eq!(
            samples,
            vec![
                sample(MetricKey::ServerConnectedClients, 7.0),
                sample(MetricKey::SubscriptionStatusUpdateTime, 1_700_000_000.0),
                sample(MetricKey::SubscriptionCurrentClientConnections, 3.0),
                sample(MetricKey::SubscriptionMaximumClientConnections, 10.0),
                sample(MetricKey::SubscriptionFallbackClientConnections, 0.0),
                sample(MetricKey::Up, 1.0),
            ]
        );
        assert_eq!(connector.calls(), vec![GET_VPN_SUMMARY, GET_SUBSCRIPTION_STATUS]);
        assert_eq!(connector.counters.connects.load(Ordering::SeqCst), 1);
        assert_eq!(connector.counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_call_failure_skips_second_call() {
        let connector = FakeConnector::new(|method| match method {
            GET_VPN_SUMMARY => fault(),
            _ => subscription(),
        });
        let collector = Collector::new(connector.clone());

        let mut samples = Vec::new();
        let health = collector.collect(&mut samples).await;

        assert_eq!(health, Health::Down);
        assert_eq!(samples, vec![sample(MetricKey::Up, 0.0)]);
        assert_eq!(connector.calls(), vec![GET_VPN_SUMMARY]);
        assert_eq!(connector.counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_call_failure_keeps_first_sample() {
        let connector = FakeConnector::new(|method| match method {
            GET_VPN_SUMMARY => summary(4),
            _ => Err(Error::MissingField { field: "max_cc" }),
        });
        let collector = Collector::new(connector.clone());

        let mut samples = Vec::new();
        let health = collector.collect(&mut samples).await;

        assert_eq!(health, Health::Down);
        assert_eq!(
            samples,
            vec![sample(MetricKey::ServerConnectedClients, 4.0), sample(MetricKey::Up, 0.0)]
        );
        assert_eq!(connector.calls(), vec![GET_VPN_SUMMARY, GET_SUBSCRIPTION_STATUS]);
        assert_eq!(connector.counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_is_a_failed_call() {
        let connector = FakeConnector::new(|method| match method {
            GET_VPN_SUMMARY => Ok(object(&[("clients", 7)])),
            _ => subscription(),
        });

        let mut samples = Vec::new();
        let health = Collector::new(connector.clone()).collect(&mut samples).await;

        assert_eq!(health, Health::Down);
        assert_eq!(samples, vec![sample(MetricKey::Up, 0.0)]);
        assert_eq!(connector.calls(), vec![GET_VPN_SUMMARY]);
    }

    #[tokio::test]
    async fn test_values_are_emitted_unchanged() {
        let connector = FakeConnector::new(|method| match method {
            GET_VPN_SUMMARY => summary(0),
            _ => Ok(object(&[
                ("current_cc", -2),
                ("max_cc", 10),
                ("fallback_cc", 1),
                ("last_successful_update", 1_700_000_000),
            ])),
        });

        let mut samples = Vec::new();
        let health = Collector::new(connector).collect(&mut samples).await;

        assert_eq!(health, Health::Up);
        assert!(samples
            .contains(&sample(MetricKey::SubscriptionCurrentClientConnections, -2.0)));
        assert!(samples.contains(&sample(MetricKey::ServerConnectedClients, 0.0)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let connector = FakeConnector::unreachable();

        let mut samples = Vec::new();
        let health = Collector::new(connector.clone()).collect(&mut samples).await;

        assert_eq!(health, Health::Down);
        assert_eq!(samples, vec![sample(MetricKey::Up, 0.0)]);
        assert!(connector.calls().is_empty());
        assert_eq!(connector.counters.connects.load(Ordering::SeqCst), 1);
        assert_eq!(connector.counters.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeated_cycles_are_identical() {
        let connector = FakeConnector::new(healthy);
        let collector = Collector::new(connector.clone());

        let mut first = Vec::new();
        let mut second = Vec::new();
        let _ = collector.collect(&mut first).await;
        let _ = collector.collect(&mut second).await;

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.key, b.key);
            assert_eq!(a.value.to_bits(), b.value.to_bits());
        }
        assert_eq!(connector.counters.connects.load(Ordering::SeqCst), 2);
        assert_eq!(connector.counters.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exactly_one_health_sample_emitted_last() {
        let scripts: Vec<FakeConnector> = vec![
            FakeConnector::new(healthy),
            FakeConnector::new(|_| fault()),
            FakeConnector::new(|method| match method {
                GET_VPN_SUMMARY => summary(1),
                _ => fault(),
            }),
            FakeConnector::unreachable(),
        ];

        for connector in scripts {
            let mut samples = Vec::new();
            let health = Collector::new(connector).collect(&mut samples).await;

            assert_eq!(samples.iter().filter(|sample| sample.key == MetricKey::Up).count(), 1);
            assert_eq!(samples.last().map(|sample| sample.key), Some(MetricKey::Up));
            assert_eq!(samples.last().map(|sample| sample.value), Some(health.as_value()));
            assert!(samples.iter().all(|sample| sample.key != MetricKey::StatusUpdateTime));
        }
    }

    #[tokio::test]
    async fn test_gather_builds_metric_families() {
        use openvpnas_metrics::Metrics;

        let families = Collector::new(FakeConnector::new(healthy)).gather().await;
        let names: Vec<_> = families.iter().map(|family| family.get_name().to_string()).collect();

        assert_eq!(
            names,
            vec![
                "openvpnas_server_connected_clients",
                "openvpnas_subscription_status_update_time_seconds",
                "openvpnas_subscription_current_client_connections",
                "openvpnas_subscription_maximum_client_connections",
                "openvpnas_subscription_fallback_client_connections",
                "openvpnas_up",
            ]
        );
    }
}
