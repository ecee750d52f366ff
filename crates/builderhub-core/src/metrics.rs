//! `OpenTelemetry` export pipeline.
//!
//! Only compiled with the `metrics` Cargo feature. Sets up the OTLP exporter
//! for both traces and metrics, sending telemetry to a configurable endpoint
//! (e.g. an `OpenTelemetry` Collector), and owns the service counters.

use std::sync::LazyLock;

use opentelemetry::metrics::Counter;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Errors that can occur during telemetry pipeline initialisation.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to build an OTLP exporter.
    #[error("failed to build OTLP exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Failed during `OTel` SDK shutdown or flush.
    #[error("OpenTelemetry SDK error: {0}")]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),
}

/// Keeps the `OpenTelemetry` providers alive.
///
/// Dropping does not flush; call [`MetricsGuard::shutdown`] before exiting.
pub struct MetricsGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl MetricsGuard {
    /// Provider used to build the `tracing` bridge layer.
    pub const fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    /// Gracefully shut down both providers, flushing any buffered telemetry.
    pub fn shutdown(self) -> Result<(), MetricsError> {
        self.tracer_provider.shutdown()?;
        self.meter_provider.shutdown()?;
        Ok(())
    }
}

const METER_NAME: &str = "builderhub";

// Bound to the global meter provider on first use, which happens after
// `init_metrics` when the service is started with an endpoint.
static HTTP_REQUESTS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    global::meter(METER_NAME)
        .u64_counter("builderhub.http.requests")
        .with_description("HTTP responses by listener and status code")
        .build()
});

static VERIFICATIONS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    global::meter(METER_NAME)
        .u64_counter("builderhub.verifications")
        .with_description("Attestation verifications by outcome")
        .build()
});

/// Count one HTTP response served by `listener`.
pub fn record_http_request(listener: &'static str, status: u16) {
    HTTP_REQUESTS.add(
        1,
        &[
            KeyValue::new("listener", listener),
            KeyValue::new("status", i64::from(status)),
        ],
    );
}

/// Count one verification attempt. `outcome` is `verified`,
/// `measurement_mismatch` or `builder_not_found`.
pub fn record_verification(attestation_type: &str, outcome: &'static str) {
    VERIFICATIONS.add(
        1,
        &[
            KeyValue::new("attestation_type", attestation_type.to_string()),
            KeyValue::new("outcome", outcome),
        ],
    );
}

/// Initialise the OTLP pipeline for traces and metrics.
///
/// * `endpoint` -- OTLP receiver URL, e.g. `"http://localhost:4317"` (gRPC).
pub fn init_metrics(endpoint: &str) -> Result<MetricsGuard, MetricsError> {
    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .build();

    global::set_meter_provider(meter_provider.clone());

    Ok(MetricsGuard {
        tracer_provider,
        meter_provider,
    })
}
