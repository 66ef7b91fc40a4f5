//! One-time, process-wide tracing initialization.
//!
//! [`init_tracing`] must run before any instrumented framework records its first span or
//! registers its callsites. Instrumentation installed afterwards silently does not attach;
//! this ordering cannot be detected at runtime.

use std::sync::{Mutex, OnceLock, PoisonError};

use opentelemetry::{
    global,
    propagation::TextMapCompositePropagator,
    trace::TracerProvider as _,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracer, SdkTracerProvider},
};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt};

use super::TracingError;

const TRACES_PATH: &str = "/v1/traces";

/// Default port of OTLP/gRPC collectors; spans are exported over OTLP/HTTP (default port 4318).
const OTLP_GRPC_PORT: u16 = 4317;

/// Configuration for [`init_tracing_with`].
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Base URL of the OTLP/HTTP collector (e.g. `http://localhost:4318`).
    /// `/v1/traces` is appended if the URL has no path.
    pub exporter_endpoint: String,

    /// Value of the `service.name` resource attribute attached to every exported span.
    pub service_name: String,
}

/// A hook that attaches instrumentation to a framework, client or subsystem, once the tracer
/// provider has been installed.
pub trait Instrumentation: Send {
    /// Name used in error reports.
    fn name(&self) -> &str;

    /// Installs the instrumentation hooks using the specified tracer.
    ///
    /// # Errors
    ///
    /// Returns [`TracingError`] if the hooks could not be installed.
    fn install(self: Box<Self>, tracer: SdkTracer) -> Result<(), TracingError>;
}

/// Installs the global [`tracing`] subscriber with a `tracing-opentelemetry` layer, so that
/// spans recorded by any `tracing`-instrumented HTTP server, client or the logging subsystem
/// are exported.
///
/// Additional layers (for example the logging bridge) can be included with
/// [`with_layer`](Self::with_layer).
#[allow(missing_debug_implementations)] // Layers are `dyn Trait` objects
#[derive(Default)]
pub struct SubscriberInstrumentation {
    filtering_directive: Option<String>,
    layers: Vec<Box<dyn Layer<Registry> + Send + Sync + 'static>>,
}

impl SubscriberInstrumentation {
    /// Creates a new [`SubscriberInstrumentation`] exporting spans at `info` level and above.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the [`EnvFilter`] directive (e.g. `"info,my_crate=debug"`) for exported spans.
    pub fn with_filtering_directive(mut self, directive: impl Into<String>) -> Self {
        self.filtering_directive = Some(directive.into());
        self
    }

    /// Adds a layer to the installed subscriber.
    pub fn with_layer(mut self, layer: Box<dyn Layer<Registry> + Send + Sync + 'static>) -> Self {
        self.layers.push(layer);
        self
    }
}

impl Instrumentation for SubscriberInstrumentation {
    fn name(&self) -> &str {
        "tracing-subscriber"
    }

    fn install(self: Box<Self>, tracer: SdkTracer) -> Result<(), TracingError> {
        let Self {
            filtering_directive,
            mut layers,
        } = *self;

        // Using an empty string causes it to use the default directive
        let filter = EnvFilter::builder()
            .with_default_directive(tracing::Level::INFO.into())
            .parse(filtering_directive.as_deref().unwrap_or_default())?;

        layers.push(
            tracing_opentelemetry::layer::<Registry>()
                .with_tracer(tracer)
                .with_filter(filter)
                .boxed(),
        );

        let subscriber = tracing_subscriber::registry().with(layers);
        if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
            tracing::warn!(
                %error,
                "A global `tracing` subscriber is already installed, spans will not be exported"
            );
        }

        Ok(())
    }
}

#[derive(Debug)]
struct TracingState {
    provider: SdkTracerProvider,
    service_name: String,
}

static STATE: OnceLock<TracingState> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Initializes tracing with the OTLP/HTTP exporter at `exporter_endpoint` and the default
/// [`SubscriberInstrumentation`].
///
/// `exporter_endpoint` must point at the collector's OTLP/HTTP receiver, usually
/// `http://<host>:4318`. The OTLP/gRPC receiver on port 4317 cannot accept these requests.
///
/// Must be called before instrumented frameworks are first used. Calling it again is a no-op.
///
/// # Errors
///
/// Returns [`TracingError`] if the endpoint or service name is invalid, or if the exporter
/// could not be built.
pub fn init_tracing(exporter_endpoint: &str, service_name: &str) -> Result<(), TracingError> {
    let instrumentations: Vec<Box<dyn Instrumentation>> =
        vec![Box::new(SubscriberInstrumentation::new())];

    init_tracing_with(
        TracingConfig {
            exporter_endpoint: exporter_endpoint.to_owned(),
            service_name: service_name.to_owned(),
        },
        instrumentations,
    )
}

/// Initializes tracing with the specified configuration and instrumentations.
///
/// Installs a batch-exporting tracer provider as the global provider, a W3C trace context and
/// baggage propagator as the global propagator, then installs each instrumentation in order.
/// Only the first successful call has an effect.
///
/// # Errors
///
/// Returns [`TracingError`] if the configuration is invalid, the exporter could not be built,
/// or an instrumentation failed to install.
pub fn init_tracing_with(
    config: TracingConfig,
    instrumentations: Vec<Box<dyn Instrumentation>>,
) -> Result<(), TracingError> {
    let service_name = config.service_name.trim();
    if service_name.is_empty() {
        return Err(TracingError::Configuration(
            "service name must not be empty".to_owned(),
        ));
    }
    let endpoint = traces_endpoint(&config.exporter_endpoint)?;

    let _lock = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if STATE.get().is_some() {
        tracing::debug!("Tracing is already initialized, skipping");
        return Ok(());
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint.as_str())
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name(service_name.to_owned())
                .build(),
        )
        .build();

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
    for instrumentation in instrumentations {
        let name = instrumentation.name().to_owned();
        instrumentation
            .install(tracer.clone())
            .map_err(|error| match error {
                TracingError::Instrumentation { .. } => error,
                other => TracingError::Instrumentation {
                    name,
                    reason: other.to_string(),
                },
            })?;
    }

    let _ = STATE.set(TracingState {
        provider,
        service_name: service_name.to_owned(),
    });
    tracing::info!(endpoint = %endpoint, service = service_name, "Tracing initialized");

    Ok(())
}

/// Returns `true` once [`init_tracing`] or [`init_tracing_with`] has completed successfully.
pub fn is_tracing_enabled() -> bool {
    STATE.get().is_some()
}

/// Returns the service name tracing was initialized with.
pub fn service_name() -> Option<&'static str> {
    STATE.get().map(|state| state.service_name.as_str())
}

/// Flushes buffered spans and shuts the tracer provider down.
///
/// Does nothing if tracing was never initialized.
///
/// # Errors
///
/// Returns [`TracingError::Shutdown`] if the provider failed to flush or shut down.
pub fn shutdown_tracing() -> Result<(), TracingError> {
    match STATE.get() {
        Some(state) => Ok(state.provider.shutdown()?),
        None => Ok(()),
    }
}

/// Validates the collector URL and resolves the traces endpoint from it.
fn traces_endpoint(exporter_endpoint: &str) -> Result<url::Url, TracingError> {
    let mut url = url::Url::parse(exporter_endpoint.trim())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(TracingError::Configuration(format!(
            "exporter endpoint `{url}` must use the `http` or `https` scheme"
        )));
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(TRACES_PATH);
    }
    if targets_grpc_port(&url) {
        tracing::warn!(
            endpoint = %url,
            "Exporter endpoint uses the OTLP/gRPC port, spans are exported over OTLP/HTTP \
             (usually port 4318)"
        );
    }

    Ok(url)
}

fn targets_grpc_port(url: &url::Url) -> bool {
    url.port() == Some(OTLP_GRPC_PORT)
}
