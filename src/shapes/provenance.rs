//! Provenance of a generated catalog
//!
//! Records which task produced the shapes and with which parameter values.
//! The task is described in the workspace metadata graph; a fresh activity
//! resource is minted per run so the task never describes itself.

use crate::error::{Result, RunWarning};
use crate::iri::local_segment;
use crate::store::{GraphStore, TypedBinding, insert_data};
use crate::vocab::{dcterms, di, prov, rdf};
use oxigraph::model::{Graph, Literal, NamedNode, TripleRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceContext {
    /// Graph holding task and plugin descriptions
    pub metadata_graph: String,
    /// The task running this generation
    pub task_iri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Recorded { activity: String, parameters: usize },
    Skipped(RunWarning),
}

pub struct ProvenanceAnnotator {
    context: ProvenanceContext,
}

impl ProvenanceAnnotator {
    pub fn new(context: ProvenanceContext) -> Self {
        Self { context }
    }

    /// Writes provenance triples into `shapes_graph`. `parameters` maps
    /// parameter names to the values of this run.
    pub async fn annotate(
        &self,
        store: &dyn GraphStore,
        shapes_graph: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Provenance> {
        let task = &self.context.task_iri;
        let results = store.select(&self.description_query()).await?;

        let mut plugin = None;
        let mut declared = Vec::new();
        for row in results.rows() {
            let binding = TypedBinding::new(row);
            if plugin.is_none() {
                plugin = Some(binding.get_iri("plugin")?);
            }
            if let Some(parameter) = binding.get_iri_opt("parameter")? {
                if !declared.contains(&parameter) {
                    declared.push(parameter);
                }
            }
        }

        let Some(plugin) = plugin else {
            tracing::warn!(task = %task, graph = %self.context.metadata_graph, "task description not found, skipping provenance");
            return Ok(Provenance::Skipped(RunWarning::MissingProvenance {
                task: task.clone(),
            }));
        };

        let activity = NamedNode::new_unchecked(format!("urn:uuid:{}", Uuid::new_v4()));
        let shapes = NamedNode::new_unchecked(shapes_graph);
        let task_node = NamedNode::new_unchecked(task.as_str());
        let plugin = NamedNode::new_unchecked(plugin);

        let mut graph = Graph::new();
        graph.insert(TripleRef::new(shapes.as_ref(), dcterms::CREATOR, activity.as_ref()));
        graph.insert(TripleRef::new(activity.as_ref(), rdf::TYPE, plugin.as_ref()));
        graph.insert(TripleRef::new(
            activity.as_ref(),
            prov::WAS_ASSOCIATED_WITH,
            task_node.as_ref(),
        ));

        let mut recorded = 0;
        for parameter in &declared {
            let Some(value) = parameters.get(local_segment(parameter)) else {
                continue;
            };
            let predicate = NamedNode::new_unchecked(parameter.as_str());
            let value = Literal::new_simple_literal(value);
            graph.insert(TripleRef::new(activity.as_ref(), predicate.as_ref(), value.as_ref()));
            recorded += 1;
        }

        store.update(&insert_data(shapes_graph, &graph)).await?;
        tracing::info!(activity = %activity.as_str(), parameters = recorded, "provenance recorded");
        Ok(Provenance::Recorded {
            activity: activity.into_string(),
            parameters: recorded,
        })
    }

    fn description_query(&self) -> String {
        format!(
            "SELECT ?plugin ?parameter\n\
             FROM <{graph}>\n\
             WHERE {{\n  \
               <{task}> <{rdf_type}> ?plugin .\n  \
               OPTIONAL {{\n    \
                 ?parameter <{rdf_type}> <{parameter_type}> ;\n      \
                            <{parameter_of}> ?plugin .\n  \
               }}\n\
             }}\n\
             ORDER BY ?plugin ?parameter",
            graph = self.context.metadata_graph,
            task = self.context.task_iri,
            rdf_type = rdf::TYPE.as_str(),
            parameter_type = di::PLUGIN_PARAMETER.as_str(),
            parameter_of = di::PARAMETER_OF.as_str(),
        )
    }
}
