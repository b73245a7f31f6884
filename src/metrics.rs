use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub path: String,
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BuildInfoLabels {
    pub version: String,
    pub git_sha: String,
}

pub struct Metrics {
    registry: Registry,

    // Stub service metrics
    pub http_requests_total: Family<HttpLabels, Counter>,
    pub http_request_duration_seconds: Family<HttpLabels, Histogram>,
    pub http_inflight_requests: Gauge,
    pub stub_objects: Gauge,

    // Check client metrics
    pub client_requests_total: Family<HttpLabels, Counter>,
    pub client_request_duration_seconds: Family<HttpLabels, Histogram>,
    pub client_request_errors_total: Counter,
    pub checks_total: Family<OutcomeLabels, Counter>,

    pub build_info: Family<BuildInfoLabels, Gauge>,
}

fn latency_histogram() -> Histogram {
    Histogram::new(exponential_buckets(0.001, 2.0, 14)) // 1ms to ~8s
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests_total = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests",
            "Total number of HTTP requests served by the stub service",
            http_requests_total.clone(),
        );

        let http_request_duration_seconds =
            Family::<HttpLabels, Histogram>::new_with_constructor(latency_histogram);
        registry.register(
            "http_request_duration_seconds",
            "Stub service request duration in seconds",
            http_request_duration_seconds.clone(),
        );

        let http_inflight_requests = Gauge::default();
        registry.register(
            "http_inflight_requests",
            "Number of HTTP requests currently being processed",
            http_inflight_requests.clone(),
        );

        let stub_objects = Gauge::default();
        registry.register(
            "stub_objects",
            "Number of objects held by the stub service",
            stub_objects.clone(),
        );

        let client_requests_total = Family::<HttpLabels, Counter>::default();
        registry.register(
            "client_requests",
            "Total number of requests sent to the objects API",
            client_requests_total.clone(),
        );

        let client_request_duration_seconds =
            Family::<HttpLabels, Histogram>::new_with_constructor(latency_histogram);
        registry.register(
            "client_request_duration_seconds",
            "Objects API round-trip time in seconds",
            client_request_duration_seconds.clone(),
        );

        let client_request_errors_total = Counter::default();
        registry.register(
            "client_request_errors",
            "Requests that failed before a response was received",
            client_request_errors_total.clone(),
        );

        let checks_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "checks",
            "Check scenarios by outcome",
            checks_total.clone(),
        );

        let build_info = Family::<BuildInfoLabels, Gauge>::default();
        registry.register("build_info", "Build information", build_info.clone());

        let version = env!("CARGO_PKG_VERSION").to_string();
        let git_sha = option_env!("GIT_SHA").unwrap_or("unknown").to_string();
        build_info
            .get_or_create(&BuildInfoLabels { version, git_sha })
            .set(1);

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_inflight_requests,
            stub_objects,
            client_requests_total,
            client_request_duration_seconds,
            client_request_errors_total,
            checks_total,
            build_info,
        }
    }

    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Writing into a String cannot fail
        let _ = encode(&mut buffer, &self.registry);
        buffer
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: Duration) {
        let labels = HttpLabels {
            method: method.to_string(),
            path: path.to_string(),
            status: status.to_string(),
        };

        self.http_requests_total.get_or_create(&labels).inc();
        self.http_request_duration_seconds
            .get_or_create(&labels)
            .observe(duration.as_secs_f64());
    }

    pub fn record_client_request(&self, method: &str, path: &str, status: u16, duration: Duration) {
        let labels = HttpLabels {
            method: method.to_string(),
            path: path.to_string(),
            status: status.to_string(),
        };

        self.client_requests_total.get_or_create(&labels).inc();
        self.client_request_duration_seconds
            .get_or_create(&labels)
            .observe(duration.as_secs_f64());
    }

    pub fn record_check(&self, outcome: &str) {
        self.checks_total
            .get_or_create(&OutcomeLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        let encoded = metrics.encode();

        assert!(encoded.contains("build_info"));
    }

    #[test]
    fn test_http_metrics() {
        let metrics = Metrics::new();

        metrics.record_http_request("GET", "/objects", 200, Duration::from_millis(10));

        let encoded = metrics.encode();
        assert!(encoded.contains("http_requests_total"));
        assert!(encoded.contains("http_request_duration_seconds"));
        assert!(encoded.contains(r#"path="/objects""#));
    }

    #[test]
    fn test_client_and_check_metrics() {
        let metrics = Metrics::new();

        metrics.record_client_request("POST", "/objects", 200, Duration::from_millis(120));
        metrics.record_check("passed");
        metrics.record_check("failed");

        let encoded = metrics.encode();
        assert!(encoded.contains("client_requests_total"));
        assert!(encoded.contains(r#"checks_total{outcome="passed"} 1"#));
        assert!(encoded.contains(r#"checks_total{outcome="failed"} 1"#));
    }
}
