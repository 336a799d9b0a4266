pub mod config;
pub mod error;
pub mod iri;
pub mod logging;
pub mod pipeline;
pub mod shapes;
pub mod store;
pub mod vocab;

pub use config::{AppConfig, CliArgs, ShapesConfig, Transport};
pub use error::{ErrorCode, RunWarning, ShapesError};
pub use logging::{LoggingConfig, init_logging, shutdown_telemetry};
pub use pipeline::{RunReport, generate_shapes};

use anyhow::{Context, Result};
use logging::stage_span;
use shapes::PrefixResolver;
use store::{
    GraphStore, HttpGraphStore, HttpTitleService, LocalTitleService, MemoryStore, build_client,
    to_ntriples,
};
use tracing::Instrument;

/// Runs one generation with the transport selected by `config`.
pub async fn run(config: AppConfig) -> Result<RunReport> {
    let client = build_client(config.request_timeout)?;

    let mut resolver = PrefixResolver::new(config.project_prefixes.clone());
    if config.shapes.prefix_cc {
        resolver = resolver.with_remote(client.clone(), config.prefix_directory_url.clone());
    }
    let prefixes = resolver
        .resolve()
        .instrument(stage_span("prefixes", &config.shapes.data_graph))
        .await?;

    match &config.transport {
        Transport::Remote { endpoints, session } => {
            tracing::info!(
                store = %endpoints.query,
                data_graph = %config.shapes.data_graph,
                shapes_graph = %config.shapes.shapes_graph,
                policy = %config.shapes.existing_graph,
                "generating shapes"
            );
            let store = HttpGraphStore::new(client.clone(), endpoints.clone(), session.clone());
            let titles = HttpTitleService::new(client, endpoints.title.clone(), session.clone());
            let report = generate_shapes(
                &store,
                &titles,
                &prefixes,
                &config.shapes,
                config.provenance.as_ref(),
            )
            .await?;
            Ok(report)
        }
        Transport::Local {
            data_file,
            output_file,
        } => {
            tracing::info!(
                file = %data_file.display(),
                data_graph = %config.shapes.data_graph,
                "generating shapes from local file"
            );
            let store = MemoryStore::new()?;
            store.load_file(&config.shapes.data_graph, data_file)?;
            let titles = LocalTitleService::new(store.clone(), prefixes.table.clone());
            let report = generate_shapes(
                &store,
                &titles,
                &prefixes,
                &config.shapes,
                config.provenance.as_ref(),
            )
            .await?;

            if let Some(path) = output_file {
                let graph = store.read_graph(&config.shapes.shapes_graph).await?;
                tokio::fs::write(path, to_ntriples(&graph))
                    .await
                    .with_context(|| format!("failed to write shapes to {:?}", path))?;
                tracing::info!(file = %path.display(), triples = graph.len(), "shapes written");
            }
            Ok(report)
        }
    }
}
