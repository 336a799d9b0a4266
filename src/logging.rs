//! Log and trace output
//!
//! The run report goes to stdout, so log lines go to stderr unless
//! `SHAPEGEN_LOG_OUTPUT` says otherwise. Spans can also be exported over
//! OTLP when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry::trace::TraceError;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, Tracer};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

const SERVICE_NAME: &str = "shapegen";
const DEFAULT_DIRECTIVES: &str = "warn,shapegen=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event
    Compact,
    /// Multi-line, with source locations
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    Stdout,
    /// Daily rotated `shapegen.<date>` files in the directory
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtlpConfig {
    pub endpoint: String,
    pub timeout: Duration,
    /// Fraction of root traces kept, 0.0 to 1.0
    pub sampling_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    /// `EnvFilter` directives; `RUST_LOG` wins when set
    pub directives: String,
    pub otlp: Option<OtlpConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            directives: DEFAULT_DIRECTIVES.to_string(),
            otlp: None,
        }
    }
}

impl LoggingConfig {
    /// Reads `SHAPEGEN_LOG`, `SHAPEGEN_LOG_FORMAT`, `SHAPEGEN_LOG_OUTPUT`,
    /// `SHAPEGEN_LOG_DIR` and the `OTEL_*` exporter variables. Unknown values
    /// keep the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(directives) = var("SHAPEGEN_LOG").filter(|d| !d.trim().is_empty()) {
            config.directives = directives;
        }

        match var("SHAPEGEN_LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("json") => config.format = LogFormat::Json,
            Some("pretty") => config.format = LogFormat::Pretty,
            Some("compact") => config.format = LogFormat::Compact,
            _ => {}
        }

        match var("SHAPEGEN_LOG_OUTPUT").as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("stdout") => config.output = LogOutput::Stdout,
            Some("file") => {
                let dir = var("SHAPEGEN_LOG_DIR").unwrap_or_else(|| "logs".to_string());
                config.output = LogOutput::File(PathBuf::from(dir));
            }
            _ => {}
        }

        if let Some(endpoint) = var("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.is_empty()) {
            let timeout = var("OTEL_EXPORTER_OTLP_TIMEOUT")
                .and_then(|ms| ms.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_secs(10));
            let sampling_ratio = var("OTEL_TRACES_SAMPLER_ARG")
                .and_then(|ratio| ratio.parse::<f64>().ok())
                .map(|ratio| ratio.clamp(0.0, 1.0))
                .unwrap_or(1.0);
            config.otlp = Some(OtlpConfig {
                endpoint,
                timeout,
                sampling_ratio,
            });
        }

        config
    }
}

impl OtlpConfig {
    fn sampler(&self) -> Sampler {
        match self.sampling_ratio {
            r if r >= 1.0 => Sampler::AlwaysOn,
            r if r <= 0.0 => Sampler::AlwaysOff,
            r => Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(r))),
        }
    }

    /// Installs the batch exporter as the global tracer provider.
    fn tracer(&self) -> Result<Tracer, TraceError> {
        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(&self.endpoint)
            .with_timeout(self.timeout);
        let resource = Resource::new([
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                SERVICE_NAME,
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            ),
        ]);
        opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(
                opentelemetry_sdk::trace::Config::default()
                    .with_sampler(self.sampler())
                    .with_resource(resource),
            )
            .install_batch(opentelemetry_sdk::runtime::Tokio)
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer(format: LogFormat, writer: NonBlocking, filter: EnvFilter) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(FmtSpan::CLOSE);
    match format {
        LogFormat::Compact => layer.compact().with_filter(filter).boxed(),
        LogFormat::Pretty => layer
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_filter(filter)
            .boxed(),
    }
}

/// Installs the global subscriber.
///
/// Buffered lines are flushed when the returned guard drops; keep it alive
/// for the whole run.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.directives))
        .with_context(|| format!("invalid log directives {:?}", config.directives))?;

    let (writer, guard) = match &config.output {
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, SERVICE_NAME))
        }
    };

    // Exporter failures only cost the traces, never the run.
    let (otel_layer, otel_error) = match config.otlp.as_ref().map(OtlpConfig::tracer) {
        Some(Ok(tracer)) => (Some(tracing_opentelemetry::layer().with_tracer(tracer)), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer(config.format, writer, filter))
        .with(otel_layer)
        .try_init()
        .context("a global subscriber is already installed")?;

    if let Some(e) = otel_error {
        tracing::warn!(error = %e, "OTLP exporter unavailable, traces are not exported");
    }
    tracing::debug!(format = ?config.format, output = ?config.output, otlp = config.otlp.is_some(), "logging initialized");
    Ok(guard)
}

/// Flushes pending spans to the exporter, if one was installed.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// Span around one pipeline stage working on `graph`.
pub fn stage_span(stage: &'static str, graph: &str) -> tracing::Span {
    tracing::info_span!("stage", otel.name = stage, stage, graph)
}
