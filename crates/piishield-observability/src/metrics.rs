//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for PII Shield:
//! - Request counts by endpoint and outcome
//! - Request latency and input size histograms
//! - Detection counts by PII type
//!
//! Labels carry endpoint names, outcomes and PII type labels only. Matched
//! values never reach a metric.

use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
};
use std::sync::Arc;

/// Request outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ClientError,
    Timeout,
    ServerError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ClientError => "client_error",
            Outcome::Timeout => "timeout",
            Outcome::ServerError => "server_error",
        }
    }
}

/// Metrics collector for PII Shield
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Requests by endpoint and outcome
    pub requests_total: CounterVec,
    /// End-to-end request duration
    pub request_duration_seconds: HistogramVec,

    /// Final matches by PII type
    pub detections_total: CounterVec,
    /// Size of each scanned text in bytes
    pub text_size_bytes: Histogram,
    /// Texts per batch request
    pub batch_size: Histogram,

    /// Number of compiled registry patterns
    pub patterns_loaded: Gauge,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("piishield_requests_total", "Total number of requests"),
            &["endpoint", "outcome"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "piishield_request_duration_seconds",
                "Request duration in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
            ]),
            &["endpoint"],
        )?;

        let detections_total = CounterVec::new(
            Opts::new(
                "piishield_detections_total",
                "Total number of PII matches reported",
            ),
            &["pii_type"],
        )?;

        let text_size_bytes = Histogram::with_opts(
            HistogramOpts::new("piishield_text_size_bytes", "Scanned text size in bytes")
                .buckets(prometheus::exponential_buckets(64.0, 4.0, 9)?),
        )?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("piishield_batch_size", "Number of texts per batch request")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;

        let patterns_loaded = Gauge::with_opts(Opts::new(
            "piishield_patterns_loaded",
            "Number of compiled detection patterns",
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(detections_total.clone()))?;
        registry.register(Box::new(text_size_bytes.clone()))?;
        registry.register(Box::new(batch_size.clone()))?;
        registry.register(Box::new(patterns_loaded.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration_seconds,
            detections_total,
            text_size_bytes,
            batch_size,
            patterns_loaded,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a finished request
    pub fn record_request(&self, endpoint: &str, outcome: Outcome, duration_secs: f64) {
        self.requests_total
            .with_label_values(&[endpoint, outcome.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    /// Record matches reported for one text, as `(pii_type, count)` pairs
    pub fn record_detections<'a, I>(&self, counts: I)
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        for (pii_type, count) in counts {
            self.detections_total
                .with_label_values(&[pii_type])
                .inc_by(count as f64);
        }
    }

    pub fn record_text_size(&self, bytes: usize) {
        self.text_size_bytes.observe(bytes as f64);
    }

    pub fn record_batch(&self, texts: usize) {
        self.batch_size.observe(texts as f64);
    }

    pub fn set_patterns_loaded(&self, count: usize) {
        self.patterns_loaded.set(count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str, label: &str) -> f64 {
        let gathered = metrics.registry().gather();
        let family = gathered
            .iter()
            .find(|m| m.name() == name)
            .expect("metric not found");

        family
            .metric
            .iter()
            .find(|m| m.label.iter().any(|l| l.value() == label))
            .and_then(|m| m.counter.as_ref())
            .and_then(|c| c.value)
            .expect("labelled counter not found")
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.set_patterns_loaded(12);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("detect", Outcome::Success, 0.002);
        metrics.record_request("detect", Outcome::Success, 0.003);
        metrics.record_request("mask", Outcome::ClientError, 0.001);

        assert_eq!(counter_value(&metrics, "piishield_requests_total", "client_error"), 1.0);

        let gathered = metrics.registry().gather();
        let family = gathered
            .iter()
            .find(|m| m.name() == "piishield_requests_total")
            .expect("requests_total metric not found");
        let total: f64 = family
            .metric
            .iter()
            .filter_map(|m| m.counter.as_ref().and_then(|c| c.value))
            .sum();
        assert_eq!(total, 3.0);
    }

    #[test]
    fn test_record_detections() {
        let metrics = Metrics::new().unwrap();
        metrics.record_detections([("SSN", 2), ("EMAIL", 1)]);
        metrics.record_detections([("SSN", 1)]);

        assert_eq!(counter_value(&metrics, "piishield_detections_total", "SSN"), 3.0);
        assert_eq!(counter_value(&metrics, "piishield_detections_total", "EMAIL"), 1.0);
    }

    #[test]
    fn test_record_sizes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_text_size(1024);
        metrics.record_batch(3);

        let gathered = metrics.registry().gather();
        let family = gathered
            .iter()
            .find(|m| m.name() == "piishield_text_size_bytes")
            .expect("text_size_bytes metric not found");

        let histogram = family.metric[0].histogram.as_ref().unwrap();
        assert_eq!(histogram.sample_count.unwrap(), 1);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Success.as_str(), "success");
        assert_eq!(Outcome::Timeout.as_str(), "timeout");
    }
}
