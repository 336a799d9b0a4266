//! Catalog reconciliation
//!
//! Decides how a freshly synthesized [`ShapesGraph`] lands in the target
//! graph, based on an [`ExistingGraphPolicy`]:
//!
//! | policy    | target absent | target present                          |
//! |-----------|---------------|-----------------------------------------|
//! | `stop`    | write         | fail with `AlreadyExists`, no writes    |
//! | `replace` | write         | overwrite, fresh `created`              |
//! | `add`     | write         | merge label, insert missing, `modified` |

use super::synth::ShapesGraph;
use crate::error::{Result, RunWarning, ShapesError};
use crate::iri::is_valid_uri;
use crate::store::{GraphStore, WriteMode, to_ntriples};
use crate::vocab::{CENTRAL_SHAPES_CATALOG, dcterms, owl, rdfs, xsd};
use chrono::{DateTime, SecondsFormat, Utc};
use oxigraph::model::{Graph, Literal, NamedNode, NamedNodeRef, TermRef, TripleRef};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

const LABEL_PREFIX: &str = "Shapes for ";

/// What to do when the target graph already exists
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExistingGraphPolicy {
    /// Merge into the existing graph
    Add,
    /// Overwrite the existing graph
    Replace,
    /// Refuse to touch the existing graph
    #[default]
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CatalogOutcome {
    Created,
    Replaced,
    Merged { inserted: usize, label_changed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub outcome: CatalogOutcome,
    pub warnings: Vec<RunWarning>,
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct CatalogReconciler {
    policy: ExistingGraphPolicy,
    label: Option<String>,
    clock: Clock,
}

impl CatalogReconciler {
    pub fn new(policy: ExistingGraphPolicy) -> Self {
        Self {
            policy,
            label: None,
            clock: Box::new(Utc::now),
        }
    }

    /// Label written instead of the generated `Shapes for ...` label.
    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn policy(&self) -> ExistingGraphPolicy {
        self.policy
    }

    /// Fails with `AlreadyExists` when the stop policy would refuse the write.
    pub async fn preflight(&self, store: &dyn GraphStore, graph: &str) -> Result<bool> {
        let exists = store.graph_exists(graph).await?;
        if exists && self.policy == ExistingGraphPolicy::Stop {
            return Err(ShapesError::AlreadyExists {
                graph: graph.to_string(),
            });
        }
        Ok(exists)
    }

    pub async fn reconcile(
        &self,
        store: &dyn GraphStore,
        shapes: &ShapesGraph,
    ) -> Result<Reconciliation> {
        let exists = self.preflight(store, &shapes.iri).await?;
        self.reconcile_checked(store, shapes, exists).await
    }

    /// Same as [`reconcile`](Self::reconcile), reusing the `exists` answer of
    /// an earlier [`preflight`](Self::preflight) instead of asking the store
    /// again.
    pub async fn reconcile_checked(
        &self,
        store: &dyn GraphStore,
        shapes: &ShapesGraph,
        exists: bool,
    ) -> Result<Reconciliation> {
        match (self.policy, exists) {
            (ExistingGraphPolicy::Stop, true) => Err(ShapesError::AlreadyExists {
                graph: shapes.iri.clone(),
            }),
            (ExistingGraphPolicy::Add, true) => self.merge(store, shapes).await,
            (_, exists) => {
                self.write_fresh(store, shapes).await?;
                let outcome = if exists {
                    CatalogOutcome::Replaced
                } else {
                    CatalogOutcome::Created
                };
                tracing::info!(graph = %shapes.iri, ?outcome, "catalog written");
                Ok(Reconciliation {
                    outcome,
                    warnings: Vec::new(),
                })
            }
        }
    }

    async fn write_fresh(&self, store: &dyn GraphStore, shapes: &ShapesGraph) -> Result<()> {
        let catalog = NamedNode::new_unchecked(shapes.iri.as_str());
        let label = Literal::new_simple_literal(self.fresh_label(&shapes.data_graph));
        let created = self.timestamp();

        let mut graph = shapes.graph.clone();
        graph.insert(TripleRef::new(catalog.as_ref(), rdfs::LABEL, label.as_ref()));
        graph.insert(TripleRef::new(catalog.as_ref(), dcterms::CREATED, created.as_ref()));
        store.write_graph(&shapes.iri, &graph, WriteMode::Replace).await
    }

    async fn merge(&self, store: &dyn GraphStore, shapes: &ShapesGraph) -> Result<Reconciliation> {
        let catalog = NamedNode::new_unchecked(shapes.iri.as_str());
        let existing = store.read_graph(&shapes.iri).await?;
        let mut warnings = Vec::new();

        let previous = catalog_labels(&existing, catalog.as_ref());
        let decision = self.decide_label(previous.first().map(Literal::value), &shapes.data_graph);
        let label_changed = !matches!(decision, LabelDecision::Keep);
        if let LabelDecision::Rewrite { comment: Some(old), .. } = &decision {
            tracing::warn!(graph = %shapes.iri, label = %old, "malformed catalog label");
            warnings.push(RunWarning::MalformedLabel {
                previous: old.clone(),
            });
        }
        if let LabelDecision::Rewrite { label, comment } = decision {
            let mut removed = Graph::new();
            for old in &previous {
                removed.insert(TripleRef::new(catalog.as_ref(), rdfs::LABEL, old.as_ref()));
            }
            let mut added = Graph::new();
            let label = Literal::new_simple_literal(label);
            added.insert(TripleRef::new(catalog.as_ref(), rdfs::LABEL, label.as_ref()));
            if let Some(comment) = comment {
                let comment = Literal::new_simple_literal(comment);
                added.insert(TripleRef::new(catalog.as_ref(), rdfs::COMMENT, comment.as_ref()));
            }
            store
                .update(&replace_data(&shapes.iri, &removed, &added))
                .await?;
        }

        let mut missing = Graph::new();
        for triple in shapes.graph.iter() {
            if !existing.contains(triple) {
                missing.insert(triple);
            }
        }
        if !missing.is_empty() {
            store
                .write_graph(&shapes.iri, &missing, WriteMode::Append)
                .await?;
        }

        store
            .update(&touch_modified(&shapes.iri, &self.timestamp()))
            .await?;

        let outcome = CatalogOutcome::Merged {
            inserted: missing.len(),
            label_changed,
        };
        tracing::info!(graph = %shapes.iri, ?outcome, "catalog merged");
        Ok(Reconciliation { outcome, warnings })
    }

    fn fresh_label(&self, data_graph: &str) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| default_label(data_graph))
    }

    fn decide_label(&self, previous: Option<&str>, data_graph: &str) -> LabelDecision {
        if let Some(explicit) = &self.label {
            return if previous == Some(explicit.as_str()) {
                LabelDecision::Keep
            } else {
                LabelDecision::Rewrite {
                    label: explicit.clone(),
                    comment: None,
                }
            };
        }
        let previous = match previous.map(str::trim) {
            None | Some("") => {
                return LabelDecision::Rewrite {
                    label: default_label(data_graph),
                    comment: None,
                };
            }
            Some(previous) => previous,
        };
        match parse_default_label(previous) {
            Some(sources) if sources.contains(&data_graph) => LabelDecision::Keep,
            Some(_) => LabelDecision::Rewrite {
                label: format!("{previous}, {data_graph}"),
                comment: None,
            },
            None => LabelDecision::Rewrite {
                label: default_label(data_graph),
                comment: Some(previous.to_string()),
            },
        }
    }

    fn timestamp(&self) -> Literal {
        Literal::new_typed_literal(
            (self.clock)().to_rfc3339_opts(SecondsFormat::Millis, true),
            xsd::DATE_TIME,
        )
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LabelDecision {
    Keep,
    Rewrite {
        label: String,
        comment: Option<String>,
    },
}

pub fn default_label(data_graph: &str) -> String {
    format!("{LABEL_PREFIX}{data_graph}")
}

/// Source graphs listed by a generated label, `None` when the label does not
/// follow the `Shapes for <iri>, <iri>, ...` form.
pub fn parse_default_label(label: &str) -> Option<Vec<&str>> {
    let sources: Vec<&str> = label
        .strip_prefix(LABEL_PREFIX)?
        .split(',')
        .map(str::trim)
        .collect();
    sources
        .iter()
        .all(|source| is_valid_uri(source))
        .then_some(sources)
}

fn catalog_labels(graph: &Graph, catalog: NamedNodeRef<'_>) -> Vec<Literal> {
    let mut labels: Vec<Literal> = graph
        .triples_for_subject(catalog)
        .filter(|t| t.predicate == rdfs::LABEL)
        .filter_map(|t| match t.object {
            TermRef::Literal(literal) => Some(literal.into_owned()),
            _ => None,
        })
        .collect();
    labels.sort_by(|a, b| a.value().cmp(b.value()));
    labels
}

fn replace_data(graph: &str, removed: &Graph, added: &Graph) -> String {
    let mut update = String::new();
    if !removed.is_empty() {
        update.push_str(&format!(
            "DELETE DATA {{\n  GRAPH <{graph}> {{\n{}  }}\n}};\n",
            to_ntriples(removed)
        ));
    }
    update.push_str(&format!(
        "INSERT DATA {{\n  GRAPH <{graph}> {{\n{}  }}\n}}",
        to_ntriples(added)
    ));
    update
}

/// Replaces every `dcterms:modified` of the catalog in one request.
fn touch_modified(graph: &str, now: &Literal) -> String {
    let modified = dcterms::MODIFIED.as_str();
    format!(
        "DELETE {{ GRAPH <{graph}> {{ <{graph}> <{modified}> ?modified }} }}\n\
         WHERE {{ GRAPH <{graph}> {{ <{graph}> <{modified}> ?modified }} }};\n\
         INSERT DATA {{ GRAPH <{graph}> {{ <{graph}> <{modified}> {now} }} }}"
    )
}

/// Adds `shapes_graph` to the imports of the central shapes catalog.
///
/// Returns `false` when the import was already declared.
pub async fn ensure_imported(store: &dyn GraphStore, shapes_graph: &str) -> Result<bool> {
    let imports = owl::IMPORTS.as_str();
    let central = CENTRAL_SHAPES_CATALOG;
    let declared = store
        .ask(&format!(
            "ASK {{ GRAPH <{central}> {{ <{central}> <{imports}> <{shapes_graph}> }} }}"
        ))
        .await?;
    if declared {
        tracing::debug!(graph = shapes_graph, "already imported by central catalog");
        return Ok(false);
    }
    store
        .update(&format!(
            "INSERT DATA {{ GRAPH <{central}> {{ <{central}> <{imports}> <{shapes_graph}> }} }}"
        ))
        .await?;
    tracing::info!(graph = shapes_graph, "imported into central catalog");
    Ok(true)
}
