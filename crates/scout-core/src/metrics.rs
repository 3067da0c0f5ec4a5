//! `OpenTelemetry` traces and metrics.
//!
//! Only compiled when the `metrics` Cargo feature is enabled. Sets up the
//! OTLP exporters and exposes the counters the relay reports through.

use std::sync::OnceLock;

use opentelemetry::metrics::Counter;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

const METER_NAME: &str = "scout";

/// Telemetry pipeline setup or shutdown failure.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("cannot build OTLP exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("telemetry flush failed: {0}")]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),
}

/// Keeps the providers alive. Call [`MetricsGuard::shutdown`] to flush
/// before exiting; dropping does not.
pub struct MetricsGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl MetricsGuard {
    /// Flush and stop both providers.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Sdk`] if either provider fails to flush.
    pub fn shutdown(self) -> Result<(), MetricsError> {
        let traces = self.tracer_provider.shutdown();
        let metrics = self.meter_provider.shutdown();
        traces?;
        metrics?;
        Ok(())
    }
}

/// Install global trace and meter providers exporting over OTLP/gRPC.
///
/// `endpoint` is the collector URL (e.g. `http://localhost:4317`);
/// `service_name` tags every exported span and data point.
///
/// # Errors
///
/// Returns [`MetricsError::ExporterBuild`] if an exporter cannot be built.
/// Nothing is installed globally in that case.
pub fn init_metrics(
    endpoint: &str,
    service_name: &'static str,
) -> Result<MetricsGuard, MetricsError> {
    let resource = Resource::builder().with_service_name(service_name).build();
    let tracer_provider = tracer_provider(endpoint, resource.clone())?;
    let meter_provider = meter_provider(endpoint, resource)?;

    global::set_tracer_provider(tracer_provider.clone());
    global::set_meter_provider(meter_provider.clone());
    Ok(MetricsGuard {
        tracer_provider,
        meter_provider,
    })
}

fn tracer_provider(
    endpoint: &str,
    resource: Resource,
) -> Result<SdkTracerProvider, MetricsError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

fn meter_provider(endpoint: &str, resource: Resource) -> Result<SdkMeterProvider, MetricsError> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_periodic_exporter(exporter)
        .build())
}

fn malformed_lines() -> &'static Counter<u64> {
    static COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
    COUNTER.get_or_init(|| {
        global::meter(METER_NAME)
            .u64_counter("scout.ndjson.malformed_lines")
            .with_description("NDJSON lines skipped because they failed to decode")
            .build()
    })
}

fn upstream_failures() -> &'static Counter<u64> {
    static COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
    COUNTER.get_or_init(|| {
        global::meter(METER_NAME)
            .u64_counter("scout.upstream.failures")
            .with_description("Upstream calls that ended in an error")
            .build()
    })
}

/// Count one skipped NDJSON line.
pub fn record_malformed_line() {
    malformed_lines().add(1, &[]);
}

/// Count one failed upstream call, tagged by error kind.
pub fn record_upstream_failure(kind: &'static str) {
    upstream_failures().add(1, &[KeyValue::new("kind", kind)]);
}
