//! One shape generation run, end to end

use crate::config::ShapesConfig;
use crate::error::{Result, RunWarning, ShapesError};
use crate::logging::stage_span;
use crate::shapes::{
    CatalogOutcome, CatalogReconciler, NameResolver, PrefixResolution, Provenance,
    ProvenanceAnnotator, ProvenanceContext, SchemaExtractor, ShapeSynthesizer, ensure_imported,
};
use crate::store::{GraphStore, TitleService};
use serde::Serialize;
use std::time::Instant;
use tracing::Instrument;

/// Summary of a finished run, printed by the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub data_graph: String,
    pub shapes_graph: String,
    pub classes: usize,
    pub node_shapes: usize,
    pub property_shapes: usize,
    pub triples: usize,
    pub outcome: CatalogOutcome,
    /// `Some(true)` when the central catalog import was added by this run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance_activity: Option<String>,
    pub warnings: Vec<RunWarning>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn shape_count(&self) -> usize {
        self.node_shapes + self.property_shapes
    }
}

/// Extracts, synthesizes and reconciles the shapes of `config.data_graph`.
///
/// Nothing is written when the stop policy finds an existing shapes graph.
pub async fn generate_shapes(
    store: &dyn GraphStore,
    titles: &dyn TitleService,
    prefixes: &PrefixResolution,
    config: &ShapesConfig,
    provenance: Option<&ProvenanceContext>,
) -> Result<RunReport> {
    let started = Instant::now();
    config.validate()?;
    if config.provenance && provenance.is_none() {
        return Err(ShapesError::config(
            "provenance requires a metadata graph and a task IRI",
        ));
    }

    let mut warnings: Vec<RunWarning> = prefixes.warning.iter().cloned().collect();

    let reconciler =
        CatalogReconciler::new(config.existing_graph).with_label(config.label.clone());
    let exists = reconciler
        .preflight(store, &config.shapes_graph)
        .instrument(stage_span("preflight", &config.shapes_graph))
        .await?;

    let schema = SchemaExtractor::new(&config.data_graph, config.ignore_properties.clone())
        .extract(store)
        .instrument(stage_span("extract", &config.data_graph))
        .await?;

    let names = NameResolver::new(titles, &prefixes.table);
    let shapes = ShapeSynthesizer::new(&config.shapes_graph, &config.data_graph)
        .synthesize(&schema, &names)
        .instrument(stage_span("synthesize", &config.shapes_graph))
        .await?;
    warnings.extend(shapes.warnings.iter().cloned());

    let reconciliation = reconciler
        .reconcile_checked(store, &shapes, exists)
        .instrument(stage_span("reconcile", &config.shapes_graph))
        .await?;
    warnings.extend(reconciliation.warnings);

    let imported = if config.import_shapes {
        Some(
            ensure_imported(store, &config.shapes_graph)
                .instrument(stage_span("import", &config.shapes_graph))
                .await?,
        )
    } else {
        None
    };

    let mut provenance_activity = None;
    if let (true, Some(context)) = (config.provenance, provenance) {
        let outcome = ProvenanceAnnotator::new(context.clone())
            .annotate(store, &config.shapes_graph, &config.parameters())
            .instrument(stage_span("provenance", &config.shapes_graph))
            .await?;
        match outcome {
            Provenance::Recorded { activity, .. } => provenance_activity = Some(activity),
            Provenance::Skipped(warning) => warnings.push(warning),
        }
    }

    let report = RunReport {
        data_graph: config.data_graph.clone(),
        shapes_graph: config.shapes_graph.clone(),
        classes: schema.class_count(),
        node_shapes: shapes.node_shapes,
        property_shapes: shapes.property_shapes,
        triples: shapes.graph.len(),
        outcome: reconciliation.outcome,
        imported,
        provenance_activity,
        warnings,
        duration_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        shapes_graph = %report.shapes_graph,
        shapes = report.shape_count(),
        warnings = report.warnings.len(),
        duration_ms = report.duration_ms,
        "shapes generated"
    );
    Ok(report)
}
