//! Existing-graph policies, label merge, timestamps and the central catalog
//! import.

mod support;

use assert_matches::assert_matches;
use chrono::{DateTime, TimeZone, Utc};
use oxigraph::model::Graph;
use shapegen::error::{RunWarning, ShapesError};
use shapegen::shapes::{
    CatalogOutcome, CatalogReconciler, ExistingGraphPolicy, ProvenanceContext, ShapesGraph,
};
use shapegen::store::{GraphStore, MemoryStore, WriteMode};
use shapegen::vocab::{CENTRAL_SHAPES_CATALOG, dcterms, owl, rdfs};
use support::*;

const STALE: &str = "<http://ex.org/stale> <http://ex.org/p> <http://ex.org/o> .";

fn existing(turtle: &str) -> MemoryStore {
    let store = store_with(KNOWS);
    store.load_turtle(SHAPES, turtle).expect("load existing catalog");
    store
}

#[tokio::test]
async fn stop_refuses_existing_graph_without_writing() {
    let store = existing(STALE);
    let mut config = config(ExistingGraphPolicy::Stop);
    config.import_shapes = true;

    let err = generate(&store, &config).await.unwrap_err();
    assert_matches!(err, ShapesError::AlreadyExists { ref graph } if graph == SHAPES);
    assert_eq!(err.code().code(), 3);

    assert_eq!(shapes_graph(&store).await.len(), 1);
    assert!(!store.graph_exists(CENTRAL_SHAPES_CATALOG).await.unwrap());
}

#[tokio::test]
async fn replace_overwrites_and_never_sets_modified() {
    let store = existing(&format!(
        "{STALE}\n<{SHAPES}> <{}> \"2020-01-01T00:00:00.000Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime> .",
        dcterms::MODIFIED.as_str()
    ));

    let report = generate(&store, &config(ExistingGraphPolicy::Replace))
        .await
        .expect("generate");
    assert_eq!(report.outcome, CatalogOutcome::Replaced);

    let graph = shapes_graph(&store).await;
    assert!(!to_lines(&graph).iter().any(|l| l.contains("http://ex.org/stale")));
    assert_eq!(count(&graph, dcterms::CREATED), 1);
    assert_eq!(count(&graph, dcterms::MODIFIED), 0);
}

#[tokio::test]
async fn add_on_absent_graph_behaves_like_replace() {
    let store = store_with(KNOWS);
    let report = generate(&store, &config(ExistingGraphPolicy::Add))
        .await
        .expect("generate");
    assert_eq!(report.outcome, CatalogOutcome::Created);
    assert_eq!(count(&shapes_graph(&store).await, dcterms::MODIFIED), 0);
}

#[tokio::test]
async fn add_merges_without_deleting_and_touches_modified() {
    let store = store_with(KNOWS);
    generate(&store, &config(ExistingGraphPolicy::Replace))
        .await
        .expect("first run");
    store
        .load_turtle(SHAPES, STALE)
        .expect("add unrelated triple");
    let created = objects(&shapes_graph(&store).await, dcterms::CREATED);

    let report = generate(&store, &config(ExistingGraphPolicy::Add))
        .await
        .expect("merge");
    assert_eq!(
        report.outcome,
        CatalogOutcome::Merged {
            inserted: 0,
            label_changed: false
        }
    );

    generate(&store, &config(ExistingGraphPolicy::Add))
        .await
        .expect("second merge");

    let graph = shapes_graph(&store).await;
    assert!(to_lines(&graph).iter().any(|l| l.contains("http://ex.org/stale")));
    assert_eq!(objects(&graph, dcterms::CREATED), created);
    assert_eq!(count(&graph, dcterms::MODIFIED), 1);
}

#[tokio::test]
async fn add_inserts_only_missing_shapes() {
    let store = store_with(KNOWS);
    generate(&store, &config(ExistingGraphPolicy::Replace))
        .await
        .expect("first run");
    let before = shapes_graph(&store).await.len();

    store
        .load_turtle(
            DATA,
            "@prefix : <http://ex.org/> .\n:a :name \"A\" .",
        )
        .expect("extend data");
    let report = generate(&store, &config(ExistingGraphPolicy::Add))
        .await
        .expect("merge");

    let inserted = assert_matches!(report.outcome, CatalogOutcome::Merged { inserted, .. } => inserted);
    // property shape (7 triples, no inverse flag) plus its sh:property link
    assert_eq!(inserted, 7);
    // plus dcterms:modified
    assert_eq!(shapes_graph(&store).await.len(), before + inserted + 1);
}

#[tokio::test]
async fn malformed_label_is_kept_as_comment() {
    let store = existing(&format!("<{SHAPES}> <{}> \"My shapes\" .", rdfs::LABEL.as_str()));

    let report = generate(&store, &config(ExistingGraphPolicy::Add))
        .await
        .expect("merge");
    assert_eq!(
        report.warnings,
        vec![RunWarning::MalformedLabel {
            previous: "My shapes".to_string()
        }]
    );

    let graph = shapes_graph(&store).await;
    assert_eq!(literal_values(&graph, rdfs::COMMENT), vec!["My shapes"]);
    assert!(literal_values(&graph, rdfs::LABEL).contains(&"Shapes for http://ex.org/data/".to_string()));
    assert!(!literal_values(&graph, rdfs::LABEL).contains(&"My shapes".to_string()));
}

#[tokio::test]
async fn well_formed_label_gains_the_data_graph() {
    let store = existing(&format!(
        "<{SHAPES}> <{}> \"Shapes for http://ex.org/other/\" .",
        rdfs::LABEL.as_str()
    ));

    generate(&store, &config(ExistingGraphPolicy::Add))
        .await
        .expect("merge");

    let labels = literal_values(&shapes_graph(&store).await, rdfs::LABEL);
    assert!(labels.contains(&"Shapes for http://ex.org/other/, http://ex.org/data/".to_string()));
    assert!(!labels.contains(&"Shapes for http://ex.org/other/".to_string()));
}

#[tokio::test]
async fn explicit_label_wins_over_existing_one() {
    let store = existing(&format!(
        "<{SHAPES}> <{}> \"Shapes for http://ex.org/other/\" .",
        rdfs::LABEL.as_str()
    ));
    let mut config = config(ExistingGraphPolicy::Add);
    config.label = Some("Team shapes".to_string());

    generate(&store, &config).await.expect("merge");

    let labels = literal_values(&shapes_graph(&store).await, rdfs::LABEL);
    assert!(labels.contains(&"Team shapes".to_string()));
    assert!(!labels.iter().any(|l| l.starts_with("Shapes for")));
}

#[tokio::test]
async fn timestamps_come_from_the_clock() {
    let store = MemoryStore::new().unwrap();
    let shapes = ShapesGraph {
        iri: SHAPES.to_string(),
        data_graph: DATA.to_string(),
        graph: Graph::new(),
        node_shapes: 0,
        property_shapes: 0,
        warnings: Vec::new(),
    };
    let at: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    CatalogReconciler::new(ExistingGraphPolicy::Replace)
        .with_clock(move || at)
        .reconcile(&store, &shapes)
        .await
        .unwrap();
    assert_eq!(
        instants(&shapes_graph(&store).await, dcterms::CREATED),
        vec![at]
    );

    let later = at + chrono::Duration::hours(1);
    CatalogReconciler::new(ExistingGraphPolicy::Add)
        .with_clock(move || later)
        .reconcile(&store, &shapes)
        .await
        .unwrap();
    let graph = shapes_graph(&store).await;
    assert_eq!(instants(&graph, dcterms::MODIFIED), vec![later]);
    assert_eq!(count(&graph, dcterms::CREATED), 1);
}

#[tokio::test]
async fn import_is_added_once() {
    let store = store_with(KNOWS);
    let mut config = config(ExistingGraphPolicy::Replace);
    config.import_shapes = true;

    let first = generate(&store, &config).await.expect("first run");
    let second = generate(&store, &config).await.expect("second run");
    assert_eq!(first.imported, Some(true));
    assert_eq!(second.imported, Some(false));

    let central = store.read_graph(CENTRAL_SHAPES_CATALOG).await.unwrap();
    assert_eq!(objects(&central, owl::IMPORTS), vec![format!("<{SHAPES}>")]);
}

#[tokio::test]
async fn provenance_is_recorded_or_skipped() {
    const METADATA: &str = "http://ex.org/workspace/";
    let context = ProvenanceContext {
        metadata_graph: METADATA.to_string(),
        task_iri: "http://ex.org/workspace/task".to_string(),
    };
    let mut config = config(ExistingGraphPolicy::Replace);
    config.provenance = true;

    let store = store_with(KNOWS);
    let report = generate_with(&store, &config, Some(&context))
        .await
        .expect("without task description");
    assert!(report.provenance_activity.is_none());
    assert_matches!(
        report.warnings.as_slice(),
        [RunWarning::MissingProvenance { .. }]
    );

    store
        .load_turtle(
            METADATA,
            "@prefix di: <https://vocab.eccenca.com/di/> .\n\
             <http://ex.org/workspace/task> a <http://ex.org/plugins/shapes> .\n\
             <http://ex.org/plugins/existing_graph> a di:PluginParameter ;\n    \
                 di:parameterOf <http://ex.org/plugins/shapes> .",
        )
        .unwrap();
    let report = generate_with(&store, &config, Some(&context))
        .await
        .expect("with task description");
    let activity = report.provenance_activity.expect("activity");

    let graph = shapes_graph(&store).await;
    assert_eq!(objects(&graph, dcterms::CREATOR), vec![format!("<{activity}>")]);
    assert!(
        to_lines(&graph)
            .iter()
            .any(|l| l.contains("<http://ex.org/plugins/existing_graph> \"replace\""))
    );
}

#[tokio::test]
async fn failed_writes_surface_unchanged() {
    struct ReadOnly(MemoryStore);

    #[async_trait::async_trait]
    impl GraphStore for ReadOnly {
        async fn select(&self, query: &str) -> shapegen::error::Result<shapegen::store::SelectResults> {
            self.0.select(query).await
        }
        async fn ask(&self, query: &str) -> shapegen::error::Result<bool> {
            self.0.ask(query).await
        }
        async fn update(&self, _update: &str) -> shapegen::error::Result<()> {
            Err(ShapesError::upstream_status("sparql update", 403, "read only"))
        }
        async fn read_graph(&self, graph: &str) -> shapegen::error::Result<Graph> {
            self.0.read_graph(graph).await
        }
        async fn write_graph(&self, _graph: &str, _triples: &Graph, _mode: WriteMode) -> shapegen::error::Result<()> {
            Err(ShapesError::upstream_status("graph store", 403, "read only"))
        }
    }

    let store = ReadOnly(store_with(KNOWS));
    let prefixes = prefixes();
    let titles = shapegen::store::LocalTitleService::new(store.0.clone(), prefixes.table.clone());
    let err = shapegen::generate_shapes(
        &store,
        &titles,
        &prefixes,
        &config(ExistingGraphPolicy::Replace),
        None,
    )
    .await
    .unwrap_err();
    assert_matches!(
        err,
        ShapesError::Upstream {
            status: Some(403),
            ..
        }
    );
}

#[tokio::test]
async fn existing_graph_is_asked_about_once_per_run() {
    struct Recording {
        inner: MemoryStore,
        queries: parking_lot::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl GraphStore for Recording {
        async fn select(&self, query: &str) -> shapegen::error::Result<shapegen::store::SelectResults> {
            self.queries.lock().push(query.to_string());
            self.inner.select(query).await
        }
        async fn ask(&self, query: &str) -> shapegen::error::Result<bool> {
            self.queries.lock().push(query.to_string());
            self.inner.ask(query).await
        }
        async fn update(&self, update: &str) -> shapegen::error::Result<()> {
            self.inner.update(update).await
        }
        async fn read_graph(&self, graph: &str) -> shapegen::error::Result<Graph> {
            self.inner.read_graph(graph).await
        }
        async fn write_graph(&self, graph: &str, triples: &Graph, mode: WriteMode) -> shapegen::error::Result<()> {
            self.inner.write_graph(graph, triples, mode).await
        }
    }

    let store = Recording {
        inner: existing(STALE),
        queries: parking_lot::Mutex::new(Vec::new()),
    };
    let prefixes = prefixes();
    let titles = shapegen::store::LocalTitleService::new(store.inner.clone(), prefixes.table.clone());
    let report = shapegen::generate_shapes(
        &store,
        &titles,
        &prefixes,
        &config(ExistingGraphPolicy::Add),
        None,
    )
    .await
    .expect("merge");
    assert_matches!(report.outcome, CatalogOutcome::Merged { .. });

    let queries = store.queries.lock();
    let checks: Vec<&String> = queries
        .iter()
        .filter(|q| q.starts_with("ASK") && q.contains(&format!("GRAPH <{SHAPES}>")))
        .collect();
    assert_eq!(checks.len(), 1);
    assert!(queries.iter().all(|q| !q.contains("GRAPH ?g")));
}

/// `xsd:dateTime` objects of `predicate`; the store may normalize their lexical form.
fn instants(graph: &Graph, predicate: oxigraph::model::NamedNodeRef<'_>) -> Vec<DateTime<Utc>> {
    literal_values(graph, predicate)
        .iter()
        .map(|value| {
            DateTime::parse_from_rfc3339(value)
                .expect("xsd:dateTime")
                .with_timezone(&Utc)
        })
        .collect()
}

fn to_lines(graph: &Graph) -> Vec<String> {
    shapegen::store::to_ntriples(graph)
        .lines()
        .map(str::to_string)
        .collect()
}
