//! Tracing subscriber initialization for the controller.
//!
//! Builds the layer stack a controller deployment needs: an env-driven
//! filter, a human or JSON fmt layer (JSON is what log collectors scrape in
//! a cluster), and optionally an OpenTelemetry bridge with a stdout
//! exporter for local development (swap the exporter for OTLP in
//! production). Installation goes through `try_init`, so an embedder that
//! already owns the global subscriber gets an error back instead of a
//! panic.

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// How the controller's tracing pipeline is assembled.
#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Bridge tracing spans into OpenTelemetry (stdout exporter).
    pub enable_otel: bool,
    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
    /// Filter directive used when `RUST_LOG` is unset or invalid.
    pub default_directive: String,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            enable_otel: false,
            json: false,
            default_directive: "info".to_string(),
        }
    }
}

/// Install the global tracing subscriber for the controller.
///
/// Respects `RUST_LOG`, falling back to `options.default_directive`.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_tracing(options: &TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_directive));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(env_filter.boxed());

    if options.json {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE)
                .boxed(),
        );
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE)
                .boxed(),
        );
    }

    if options.enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("ruckus-controller");
        let _ = TRACER_PROVIDER.set(provider);
        layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Call this before process exit to ensure all buffered spans are exported.
/// Safe to call even when OTel was not enabled (no-op in that case).
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
