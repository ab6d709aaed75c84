//! The fixed set of metrics exported for an Access Server.

use std::fmt;

/// Identifies one exported metric.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MetricKey {
    Up,
    StatusUpdateTime,
    SubscriptionStatusUpdateTime,
    SubscriptionCurrentClientConnections,
    SubscriptionFallbackClientConnections,
    SubscriptionMaximumClientConnections,
    ServerConnectedClients,
}

impl MetricKey {
    pub const ALL: [Self; 7] = [
        Self::Up,
        Self::StatusUpdateTime,
        Self::SubscriptionStatusUpdateTime,
        Self::SubscriptionCurrentClientConnections,
        Self::SubscriptionFallbackClientConnections,
        Self::SubscriptionMaximumClientConnections,
        Self::ServerConnectedClients,
    ];

    const fn index(self) -> usize { self as usize }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueKind {
    Gauge,
    Counter,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gauge => write!(f, "gauge"),
            Self::Counter => write!(f, "counter"),
        }
    }
}

// Rows are in `MetricKey` declaration order.
const TABLE: [(MetricKey, &str, &str, ValueKind); 7] = [
    (MetricKey::Up, "up", "Whether scraping OpenVPN's metrics was successful.", ValueKind::Gauge),
    (
        MetricKey::StatusUpdateTime,
        "status_update_time_seconds",
        "UNIX timestamp at which the OpenVPN statistics were updated.",
        ValueKind::Gauge,
    ),
    (
        MetricKey::SubscriptionStatusUpdateTime,
        "subscription_status_update_time_seconds",
        "UNIX timestamp at which the OpenVPN subscription status was last updated.",
        ValueKind::Gauge,
    ),
    (
        MetricKey::SubscriptionCurrentClientConnections,
        "subscription_current_client_connections",
        "Number of client connections currently being used from the OpenVPN subscription.",
        ValueKind::Gauge,
    ),
    (
        MetricKey::SubscriptionFallbackClientConnections,
        "subscription_fallback_client_connections",
        "Number of fallback connections in use on the OpenVPN subscription.",
        ValueKind::Gauge,
    ),
    (
        MetricKey::SubscriptionMaximumClientConnections,
        "subscription_maximum_client_connections",
        "Maximum number of client connections allowed by the OpenVPN subscription.",
        ValueKind::Gauge,
    ),
    (
        MetricKey::ServerConnectedClients,
        "server_connected_clients",
        "Number Of Connected Clients",
        ValueKind::Gauge,
    ),
];

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetricDescriptor {
    key: MetricKey,

    name: String,

    help: &'static str,

    kind: ValueKind,
}

impl MetricDescriptor {
    #[must_use]
    pub const fn key(&self) -> MetricKey { self.key }

    /// Fully qualified metric name.
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    #[must_use]
    pub const fn help(&self) -> &'static str { self.help }

    #[must_use]
    pub const fn kind(&self) -> ValueKind { self.kind }
}

/// Immutable descriptor table, built once and shared by every collection cycle.
#[derive(Clone, Debug)]
pub struct Descriptors {
    table: [MetricDescriptor; 7],
}

impl Descriptors {
    #[must_use]
    pub fn new(namespace: &str) -> Self {
        let table = TABLE.map(|(key, name, help, kind)| MetricDescriptor {
            key,
            name: build_fq_name(namespace, name),
            help,
            kind,
        });
        Self { table }
    }

    #[must_use]
    pub fn get(&self, key: MetricKey) -> &MetricDescriptor { &self.table[key.index()] }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDescriptor> { self.table.iter() }
}

impl Default for Descriptors {
    fn default() -> Self { Self::new(openvpnas_exporter_core::METRICS_NAMESPACE) }
}

fn build_fq_name(namespace: &str, name: &str) -> String {
    [namespace, name].into_iter().filter(|part| !part.is_empty()).collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::descriptor::{Descriptors, MetricKey, ValueKind};

    #[test]
    fn test_lookup_matches_key() {
        let descriptors = Descriptors::default();
        for key in MetricKey::ALL {
            assert_eq!(descriptors.get(key).key(), key);
        }
    }

    #[test]
    fn test_names_are_unique_and_namespaced() {
        let descriptors = Descriptors::default();
        let names: HashSet<_> = descriptors.iter().map(|descriptor| descriptor.name()).collect();

        assert_eq!(names.len(), MetricKey::ALL.len());
        assert!(names.iter().all(|name| name.starts_with("openvpnas_")));
        assert_eq!(descriptors.get(MetricKey::Up).name(), "openvpnas_up");
        assert_eq!(
            descriptors.get(MetricKey::ServerConnectedClients).name(),
            "openvpnas_server_connected_clients"
        );
    }

    #[test]
    fn test_every_metric_is_a_gauge() {
        assert!(Descriptors::default().iter().all(|descriptor| descriptor.kind() == ValueKind::Gauge));
    }

    #[test]
    fn test_empty_namespace() {
        assert_eq!(Descriptors::new("").get(MetricKey::Up).name(), "up");
    }
}
