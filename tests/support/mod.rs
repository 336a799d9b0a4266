#![allow(dead_code)]

use oxigraph::model::{Graph, NamedNodeRef, TermRef};
use shapegen::config::ShapesConfig;
use shapegen::pipeline::{RunReport, generate_shapes};
use shapegen::shapes::{ExistingGraphPolicy, PrefixResolution, PrefixTable, ProvenanceContext};
use shapegen::store::{GraphStore, LocalTitleService, MemoryStore};

pub const DATA: &str = "http://ex.org/data/";
pub const SHAPES: &str = "http://ex.org/shapes/";
pub const EX: &str = "http://ex.org/";

/// `:a a :Person ; :knows :b . :b a :Person .`
pub const KNOWS: &str = "@prefix : <http://ex.org/> .\n\
                         :a a :Person ; :knows :b .\n\
                         :b a :Person .\n";

pub fn store_with(turtle: &str) -> MemoryStore {
    let store = MemoryStore::new().expect("embedded store");
    store.load_turtle(DATA, turtle).expect("load data");
    store
}

pub fn prefixes() -> PrefixResolution {
    let mut table = PrefixTable::new();
    table.add(EX, "ex");
    PrefixResolution {
        table,
        warning: None,
    }
}

pub fn config(policy: ExistingGraphPolicy) -> ShapesConfig {
    let mut config = ShapesConfig::new(DATA, SHAPES);
    config.existing_graph = policy;
    config
}

pub async fn generate(store: &MemoryStore, config: &ShapesConfig) -> shapegen::error::Result<RunReport> {
    generate_with(store, config, None).await
}

pub async fn generate_with(
    store: &MemoryStore,
    config: &ShapesConfig,
    provenance: Option<&ProvenanceContext>,
) -> shapegen::error::Result<RunReport> {
    let prefixes = prefixes();
    let titles = LocalTitleService::new(store.clone(), prefixes.table.clone());
    generate_shapes(store, &titles, &prefixes, config, provenance).await
}

pub async fn shapes_graph(store: &MemoryStore) -> Graph {
    store.read_graph(SHAPES).await.expect("read shapes graph")
}

/// Objects of `predicate`, rendered in N-Triples syntax and sorted.
pub fn objects(graph: &Graph, predicate: NamedNodeRef<'_>) -> Vec<String> {
    let mut objects: Vec<String> = graph
        .iter()
        .filter(|t| t.predicate == predicate)
        .map(|t| t.object.to_string())
        .collect();
    objects.sort();
    objects
}

/// Lexical values of literal objects of `predicate`, sorted.
pub fn literal_values(graph: &Graph, predicate: NamedNodeRef<'_>) -> Vec<String> {
    let mut values: Vec<String> = graph
        .iter()
        .filter(|t| t.predicate == predicate)
        .filter_map(|t| match t.object {
            TermRef::Literal(literal) => Some(literal.value().to_string()),
            _ => None,
        })
        .collect();
    values.sort();
    values
}

pub fn count(graph: &Graph, predicate: NamedNodeRef<'_>) -> usize {
    graph.iter().filter(|t| t.predicate == predicate).count()
}

pub fn count_typed(graph: &Graph, class: NamedNodeRef<'_>) -> usize {
    graph
        .iter()
        .filter(|t| t.predicate == shapegen::vocab::rdf::TYPE && t.object == TermRef::from(class))
        .count()
}

/// Graph without triples using `predicate`.
pub fn without(graph: &Graph, predicate: NamedNodeRef<'_>) -> Graph {
    let mut out = Graph::new();
    for triple in graph.iter().filter(|t| t.predicate != predicate) {
        out.insert(triple);
    }
    out
}
