//! Graph store and title service contracts
//!
//! The shape pipeline never talks to a triple store directly. It goes through
//! [`GraphStore`] and [`TitleService`], which have two implementations:
//!
//! - [`HttpGraphStore`] / [`HttpTitleService`]: SPARQL 1.1 protocol, graph
//!   store protocol and a title endpoint on a remote platform
//! - [`MemoryStore`] / [`LocalTitleService`]: an embedded oxigraph store, used
//!   for local files and tests

pub mod binding;
pub mod http;
pub mod memory;
pub mod results;

pub use binding::{BindingError, TypedBinding};
pub use http::{HttpGraphStore, HttpTitleService, Session, StoreEndpoints, build_client};
pub use memory::{LocalTitleService, MemoryStore};
pub use results::{Row, SelectResults};

use crate::error::Result;
use crate::vocab::rdfs;
use async_trait::async_trait;
use oxigraph::model::Graph;
use serde::{Deserialize, Serialize};

/// How a bulk write treats triples already in the target graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Drop the graph's current content first
    Replace,
    /// Add to the graph's current content
    Append,
}

/// A named graph known to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub iri: String,
    pub label: Option<String>,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Runs a SELECT query and returns its bindings.
    async fn select(&self, query: &str) -> Result<SelectResults>;

    /// Runs an ASK query.
    async fn ask(&self, query: &str) -> Result<bool>;

    /// Runs a SPARQL update.
    async fn update(&self, update: &str) -> Result<()>;

    /// Reads every triple of a named graph.
    async fn read_graph(&self, graph: &str) -> Result<Graph>;

    /// Writes a graph in bulk.
    async fn write_graph(&self, graph: &str, triples: &Graph, mode: WriteMode) -> Result<()>;

    async fn list_graphs(&self) -> Result<Vec<GraphInfo>> {
        let query = format!(
            "SELECT DISTINCT ?g ?label WHERE {{\n  \
               GRAPH ?g {{ ?s ?p ?o }}\n  \
               OPTIONAL {{ GRAPH ?g {{ ?g <{}> ?label }} }}\n\
             }}",
            rdfs::LABEL.as_str()
        );
        let results = self.select(&query).await?;
        let mut graphs: Vec<GraphInfo> = Vec::new();
        for row in results.rows() {
            let binding = TypedBinding::new(row);
            let Some(iri) = binding.get_iri_opt("g")? else {
                continue;
            };
            if graphs.iter().any(|g| g.iri == iri) {
                continue;
            }
            graphs.push(GraphInfo {
                iri,
                label: binding.get_literal_opt("label")?,
            });
        }
        Ok(graphs)
    }

    /// True when the named graph holds at least one triple.
    async fn graph_exists(&self, graph: &str) -> Result<bool> {
        self.ask(&graph_exists_query(graph)).await
    }
}

/// Human readable title of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub title: String,
    /// The title was generated from the IRI rather than taken from a label
    #[serde(rename = "fromIri", default)]
    pub from_iri: bool,
}

#[async_trait]
pub trait TitleService: Send + Sync {
    async fn title(&self, iri: &str) -> Result<Title>;
}

/// `ASK` query for a non-empty named graph.
pub fn graph_exists_query(graph: &str) -> String {
    format!("ASK {{ GRAPH <{graph}> {{ ?s ?p ?o }} }}")
}

/// Serializes a graph as sorted N-Triples.
pub fn to_ntriples(graph: &Graph) -> String {
    let mut lines: Vec<String> = graph.iter().map(|t| format!("{t} .")).collect();
    lines.sort();
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Builds an `INSERT DATA` update adding `triples` to `graph`.
pub fn insert_data(graph: &str, triples: &Graph) -> String {
    format!("INSERT DATA {{\n  GRAPH <{graph}> {{\n{}  }}\n}}", to_ntriples(triples))
}
