//! Shared tracing/logging initialization.
//!
//! Sets up `tracing_subscriber` with an env-filter, optional JSON output and,
//! with the `metrics` feature, an `OpenTelemetry` span exporter.

use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(default_filter: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    )
}

fn fmt_layer<S>(log_json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    }
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"builderhub_server=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt_layer(log_json))
        .init();
}

/// Keeps the telemetry pipeline alive for the lifetime of the process.
///
/// Holds nothing unless the `metrics` feature is enabled and an endpoint was
/// configured.
#[derive(Default)]
pub struct TelemetryGuard {
    #[cfg(feature = "metrics")]
    metrics: Option<crate::metrics::MetricsGuard>,
}

impl TelemetryGuard {
    /// Flush and shut down any exporters.
    pub fn shutdown(self) {
        #[cfg(feature = "metrics")]
        if let Some(guard) = self.metrics
            && let Err(e) = guard.shutdown()
        {
            tracing::warn!(error = %e, "Telemetry shutdown failed");
        }
    }
}

/// Initialise tracing and, when built with `metrics` and given an endpoint,
/// the OTLP trace/metric exporters.
///
/// Exporter construction failures are logged and tracing falls back to local
/// output only.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn init_tracing_with_metrics(
    default_filter: &str,
    log_json: bool,
    endpoint: Option<&str>,
) -> TelemetryGuard {
    #[cfg(feature = "metrics")]
    {
        use opentelemetry::trace::TracerProvider as _;

        let (metrics, init_error) = match endpoint.map(crate::metrics::init_metrics) {
            Some(Ok(guard)) => (Some(guard), None),
            Some(Err(e)) => (None, Some(e)),
            None => (None, None),
        };
        let otel_layer = metrics.as_ref().map(|guard| {
            tracing_opentelemetry::layer().with_tracer(guard.tracer_provider().tracer("builderhub"))
        });

        tracing_subscriber::registry()
            .with(env_filter(default_filter))
            .with(fmt_layer(log_json))
            .with(otel_layer)
            .init();

        if let Some(e) = init_error {
            tracing::warn!(error = %e, "OTLP exporter unavailable, continuing without it");
        }
        TelemetryGuard { metrics }
    }

    #[cfg(not(feature = "metrics"))]
    {
        init_tracing(default_filter, log_json);
        TelemetryGuard::default()
    }
}
