//! Embedded oxigraph store
//!
//! Runs the pipeline without a remote platform: data is loaded from files or
//! strings into named graphs, shapes are written back into the same store.

use super::results::{Row, SelectResults};
use super::{GraphStore, Title, TitleService, WriteMode, insert_data};
use crate::error::{Result, ShapesError};
use crate::iri::split_iri;
use crate::shapes::prefixes::PrefixTable;
use crate::vocab::{rdfs, skos};
use async_trait::async_trait;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{Graph, NamedNode};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const SERVICE: &str = "embedded store";

#[derive(Clone)]
pub struct MemoryStore {
    store: Store,
}

impl MemoryStore {
    pub fn new() -> Result<Self> {
        let store = Store::new().map_err(|e| ShapesError::upstream(SERVICE, e))?;
        Ok(Self { store })
    }

    /// Loads RDF data into the named graph `graph`.
    pub fn load(&self, graph: &str, format: RdfFormat, data: impl Read) -> Result<()> {
        let graph = NamedNode::new(graph)
            .map_err(|e| ShapesError::config(format!("invalid graph IRI <{graph}>: {e}")))?;
        self.store
            .load_from_reader(RdfParser::from_format(format).with_default_graph(graph), data)
            .map_err(|e| ShapesError::upstream(SERVICE, e))
    }

    pub fn load_turtle(&self, graph: &str, turtle: &str) -> Result<()> {
        self.load(graph, RdfFormat::Turtle, turtle.as_bytes())
    }

    /// Loads a file, picking the syntax from its extension.
    pub fn load_file(&self, graph: &str, path: &Path) -> Result<()> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(RdfFormat::from_extension)
            .ok_or_else(|| {
                ShapesError::config(format!("cannot infer RDF syntax of {}", path.display()))
            })?;
        let file = File::open(path)
            .map_err(|e| ShapesError::config(format!("cannot open {}: {e}", path.display())))?;
        self.load(graph, format, BufReader::new(file))
    }

    fn query(&self, query: &str) -> Result<QueryResults> {
        self.store
            .query(query)
            .map_err(|e| ShapesError::upstream(SERVICE, e))
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn select(&self, query: &str) -> Result<SelectResults> {
        match self.query(query)? {
            QueryResults::Solutions(solutions) => {
                let variables = solutions
                    .variables()
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| ShapesError::upstream(SERVICE, e))?;
                    let row: Row = solution
                        .iter()
                        .map(|(var, term)| (var.as_str().to_string(), term.clone()))
                        .collect();
                    rows.push(row);
                }
                Ok(SelectResults::new(variables, rows))
            }
            _ => Err(ShapesError::MalformedResponse(
                "expected solutions from SELECT query".to_string(),
            )),
        }
    }

    async fn ask(&self, query: &str) -> Result<bool> {
        match self.query(query)? {
            QueryResults::Boolean(value) => Ok(value),
            _ => Err(ShapesError::MalformedResponse(
                "expected boolean from ASK query".to_string(),
            )),
        }
    }

    async fn update(&self, update: &str) -> Result<()> {
        self.store
            .update(update)
            .map_err(|e| ShapesError::upstream(SERVICE, e))
    }

    async fn read_graph(&self, graph: &str) -> Result<Graph> {
        let query = format!("CONSTRUCT {{ ?s ?p ?o }} WHERE {{ GRAPH <{graph}> {{ ?s ?p ?o }} }}");
        match self.query(&query)? {
            QueryResults::Graph(triples) => {
                let mut out = Graph::new();
                for triple in triples {
                    let triple = triple.map_err(|e| ShapesError::upstream(SERVICE, e))?;
                    out.insert(&triple);
                }
                Ok(out)
            }
            _ => Err(ShapesError::MalformedResponse(
                "expected triples from CONSTRUCT query".to_string(),
            )),
        }
    }

    async fn write_graph(&self, graph: &str, triples: &Graph, mode: WriteMode) -> Result<()> {
        if mode == WriteMode::Replace {
            self.update(&format!("DROP SILENT GRAPH <{graph}>")).await?;
        }
        if triples.is_empty() {
            return Ok(());
        }
        self.update(&insert_data(graph, triples)).await
    }
}

/// Titles from `rdfs:label`/`skos:prefLabel` in any graph of the store,
/// falling back to a prefixed name derived from the IRI.
pub struct LocalTitleService {
    store: MemoryStore,
    prefixes: PrefixTable,
}

impl LocalTitleService {
    pub fn new(store: MemoryStore, prefixes: PrefixTable) -> Self {
        Self { store, prefixes }
    }

    fn derive(&self, iri: &str) -> Title {
        let title = match split_iri(iri) {
            Some((namespace, local)) => match self.prefixes.preferred(namespace) {
                Some(prefix) => format!("{prefix}{local}"),
                None => local.to_string(),
            },
            None => iri.to_string(),
        };
        Title {
            title,
            from_iri: true,
        }
    }
}

#[async_trait]
impl TitleService for LocalTitleService {
    async fn title(&self, iri: &str) -> Result<Title> {
        let query = format!(
            "SELECT ?label WHERE {{\n  \
               {{ GRAPH ?g {{ <{iri}> <{label}> ?label }} BIND(0 AS ?rank) }}\n  \
               UNION\n  \
               {{ GRAPH ?g {{ <{iri}> <{pref}> ?label }} BIND(1 AS ?rank) }}\n\
             }}\n\
             ORDER BY ?rank ?label\n\
             LIMIT 1",
            label = rdfs::LABEL.as_str(),
            pref = skos::PREF_LABEL.as_str(),
        );
        let results = self.store.select(&query).await?;
        let label = results
            .rows()
            .first()
            .map(|row| super::TypedBinding::new(row).get_literal_opt("label"))
            .transpose()?
            .flatten();
        match label {
            Some(title) if !title.is_empty() => Ok(Title {
                title,
                from_iri: false,
            }),
            _ => Ok(self.derive(iri)),
        }
    }
}
