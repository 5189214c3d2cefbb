//! OpenTelemetry metrics export module
//!
//! Mirrors every recorded event into OTLP metrics when a collector is
//! configured. Nothing is exported otherwise, and recording is a no-op.
//!
//! ## OTLP Endpoint
//! Taken from the loaded settings (`OTEL_EXPORTER_OTLP_ENDPOINT`); `http://`
//! is prefixed when the scheme is missing.

use anyhow::{Context, Result};
use log::{info, warn};
use netxtrace_common::{Event, EventName};
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use std::sync::OnceLock;
use std::time::Duration;

/// Metric export interval in seconds
const METRIC_EXPORT_INTERVAL_SECS: u64 = 10;

const SERVICE_NAME: &str = "netxtrace";
const SUCCESS: &str = "success";

/// Global metrics handle
static METRICS: OnceLock<NetxMetrics> = OnceLock::new();

/// Global MeterProvider for graceful shutdown
static METER_PROVIDER: OnceLock<SdkMeterProvider> = OnceLock::new();

/// netxtrace metrics collection
///
/// Note: Do NOT add _total suffix to Counter names (Prometheus adds it automatically)
pub struct NetxMetrics {
    pub events: Counter<u64>,
    pub failures: Counter<u64>,
    pub io_bytes: Counter<u64>,

    // Latency per major operation
    pub resolve_latency_ns: Histogram<u64>,
    pub connect_latency_ns: Histogram<u64>,
    pub tls_handshake_latency_ns: Histogram<u64>,
    pub http_round_trip_latency_ns: Histogram<u64>,
}

impl NetxMetrics {
    fn new(meter: &Meter) -> Self {
        Self {
            events: meter
                .u64_counter("netx_events")
                .with_description("Number of recorded network events")
                .with_unit("events")
                .build(),
            failures: meter
                .u64_counter("netx_failures")
                .with_description("Number of failed network operations")
                .with_unit("events")
                .build(),
            io_bytes: meter
                .u64_counter("netx_io_bytes")
                .with_description("Bytes read from or written to instrumented connections")
                .with_unit("bytes")
                .build(),
            resolve_latency_ns: meter
                .u64_histogram("netx_resolve_latency_ns")
                .with_description("Name resolution latency")
                .with_unit("ns")
                .build(),
            connect_latency_ns: meter
                .u64_histogram("netx_connect_latency_ns")
                .with_description("TCP connect latency")
                .with_unit("ns")
                .build(),
            tls_handshake_latency_ns: meter
                .u64_histogram("netx_tls_handshake_latency_ns")
                .with_description("TLS handshake latency")
                .with_unit("ns")
                .build(),
            http_round_trip_latency_ns: meter
                .u64_histogram("netx_http_round_trip_latency_ns")
                .with_description("HTTP round trip latency")
                .with_unit("ns")
                .build(),
        }
    }

    fn latency_for(&self, name: &EventName) -> Option<&Histogram<u64>> {
        match name {
            EventName::ResolveDone => Some(&self.resolve_latency_ns),
            EventName::Connect => Some(&self.connect_latency_ns),
            EventName::TlsHandshakeDone => Some(&self.tls_handshake_latency_ns),
            EventName::HttpRoundTripDone => Some(&self.http_round_trip_latency_ns),
            _ => None,
        }
    }
}

/// Returns None when no endpoint is configured or it is empty, which
/// disables metrics export (no default fallback).
fn otlp_endpoint(configured: Option<&str>) -> Option<String> {
    let endpoint = configured?.trim();
    if endpoint.is_empty() {
        return None;
    }

    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        Some(format!("http://{}", endpoint))
    } else {
        Some(endpoint.to_string())
    }
}

/// Initialize OpenTelemetry metrics provider
///
/// Configures metrics export to OTLP Collector via gRPC.
/// Skips initialization if no endpoint is configured.
pub fn init_metrics(endpoint: Option<&str>) -> Result<()> {
    let endpoint = match otlp_endpoint(endpoint) {
        Some(ep) => ep,
        None => {
            info!("OTEL_EXPORTER_OTLP_ENDPOINT not set. Metrics export disabled.");
            return Ok(());
        }
    };

    info!("Initializing OpenTelemetry metrics exporter");
    info!("OTLP endpoint: {}", endpoint);

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .with_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to create OTLP metric exporter")?;

    let reader = PeriodicReader::builder(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_interval(Duration::from_secs(METRIC_EXPORT_INTERVAL_SECS))
        .build();

    let resource = Resource::default().merge(&Resource::new(vec![
        KeyValue::new("service.name", SERVICE_NAME),
        KeyValue::new("telemetry.sdk.language", "rust"),
    ]));

    let provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build();

    global::set_meter_provider(provider.clone());
    let _ = METER_PROVIDER.set(provider);

    let meter = global::meter(SERVICE_NAME);
    let _ = METRICS.set(NetxMetrics::new(&meter));

    info!("OpenTelemetry metrics initialized successfully");
    Ok(())
}

pub fn metrics() -> Option<&'static NetxMetrics> {
    METRICS.get()
}

fn event_attributes(event: &Event) -> [KeyValue; 2] {
    [
        KeyValue::new("event", event.name.to_string()),
        KeyValue::new(
            "failure",
            event.failure.clone().unwrap_or_else(|| SUCCESS.to_string()),
        ),
    ]
}

/// Record one appended trace event
pub fn record_event(event: &Event) {
    let Some(m) = metrics() else {
        return;
    };
    let attrs = event_attributes(event);
    m.events.add(1, &attrs);

    if let (Some(failure), Some(operation)) = (&event.failure, &event.operation) {
        m.failures.add(
            1,
            &[
                KeyValue::new("operation", operation.clone()),
                KeyValue::new("failure", failure.clone()),
            ],
        );
    }

    match event.name {
        EventName::Read | EventName::Write if event.num_bytes > 0 => {
            let direction = [KeyValue::new("direction", event.name.to_string())];
            m.io_bytes.add(event.num_bytes, &direction);
        }
        _ => {}
    }

    if let Some(histogram) = m.latency_for(&event.name) {
        let latency_ns = u64::try_from(event.duration.as_nanos()).unwrap_or(u64::MAX);
        histogram.record(latency_ns, &attrs);
    }
}

/// Shutdown OpenTelemetry (graceful shutdown)
/// Flushes pending metrics and shuts down the MeterProvider
pub fn shutdown_metrics() {
    if let Some(provider) = METER_PROVIDER.get() {
        info!("Shutting down OpenTelemetry metrics...");
        if let Err(e) = provider.shutdown() {
            warn!("Failed to shutdown MeterProvider: {}", e);
        } else {
            info!("OpenTelemetry metrics shutdown complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_otlp_endpoint_not_set() {
        assert!(otlp_endpoint(None).is_none());
        assert!(otlp_endpoint(Some("")).is_none());
    }

    #[test]
    fn test_otlp_endpoint_kept() {
        assert_eq!(
            otlp_endpoint(Some("http://custom:4317")),
            Some("http://custom:4317".to_string())
        );
        assert_eq!(
            otlp_endpoint(Some("https://custom:4317")),
            Some("https://custom:4317".to_string())
        );
    }

    #[test]
    fn test_otlp_endpoint_adds_http_prefix() {
        assert_eq!(
            otlp_endpoint(Some("collector:4317")),
            Some("http://collector:4317".to_string())
        );
    }

    #[test]
    fn test_init_without_endpoint_is_disabled() {
        init_metrics(None).unwrap();
        assert!(metrics().is_none());
    }

    #[test]
    fn test_event_attributes() {
        let mut event = Event::new(EventName::Connect, Utc::now());
        let attrs = event_attributes(&event);
        assert_eq!(attrs[0].value.as_str(), "connect");
        assert_eq!(attrs[1].value.as_str(), "success");

        event.failure = Some("connection_refused".into());
        assert_eq!(event_attributes(&event)[1].value.as_str(), "connection_refused");
    }

    #[test]
    fn test_record_without_exporter_is_noop() {
        // No exporter initialized in tests.
        record_event(&Event::new(EventName::Read, Utc::now()));
    }
}
