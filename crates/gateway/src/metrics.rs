use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

/// Request instruments, registered on the global meter.
///
/// Without an installed meter provider these are no-ops.
#[derive(Clone)]
pub struct RequestMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
}

impl RequestMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];
        let duration = meter
            .f64_histogram("classification_duration_seconds")
            .with_description("Time to answer a classification request")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let requests = meter
            .u64_counter("classification_requests_total")
            .with_description("Classification requests by outcome")
            .build();

        Self { duration, requests }
    }

    pub fn record(&self, backend: &'static str, outcome: &'static str, elapsed: Duration) {
        let attributes = [
            KeyValue::new("backend", backend),
            KeyValue::new("outcome", outcome),
        ];
        self.duration.record(elapsed.as_secs_f64(), &attributes);
        self.requests.add(1, &attributes);
    }
}
