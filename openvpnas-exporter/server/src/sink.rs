use prometheus::proto;

use crate::descriptor::{MetricDescriptor, MetricKey, ValueKind};

/// Ordered, append-only receiver of samples emitted by a collection cycle.
pub trait SampleSink {
    fn emit(&mut self, descriptor: &MetricDescriptor, value: f64);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub key: MetricKey,

    pub value: f64,
}

impl SampleSink for Vec<Sample> {
    fn emit(&mut self, descriptor: &MetricDescriptor, value: f64) {
        self.push(Sample { key: descriptor.key(), value });
    }
}

/// Turns every sample into its own unlabelled Prometheus metric family.
#[derive(Debug, Default)]
pub struct MetricFamilySink {
    metric_families: Vec<proto::MetricFamily>,
}

impl MetricFamilySink {
    #[must_use]
    pub fn into_metric_families(self) -> Vec<proto::MetricFamily> { self.metric_families }
}

impl SampleSink for MetricFamilySink {
    fn emit(&mut self, descriptor: &MetricDescriptor, value: f64) {
        let mut metric = proto::Metric::default();
        let metric_type = match descriptor.kind() {
            ValueKind::Gauge => {
                let mut gauge = proto::Gauge::default();
                gauge.set_value(value);
                metric.set_gauge(gauge);
                proto::MetricType::GAUGE
            }
            ValueKind::Counter => {
                let mut counter = proto::Counter::default();
                counter.set_value(value);
                metric.set_counter(counter);
                proto::MetricType::COUNTER
            }
        };

        let mut metric_family = proto::MetricFamily::default();
        metric_family.set_name(descriptor.name().to_string());
        metric_family.set_help(descriptor.help().to_string());
        metric_family.set_field_type(metric_type);
        metric_family.set_metric(vec![metric].into());

        self.metric_families.push(metric_family);
    }
}
