//! Class and property usage observed in a data graph

use crate::error::Result;
use crate::store::{GraphStore, TypedBinding};
use crate::vocab::rdf;
use indexmap::IndexMap;
use serde::Serialize;

/// One use of a property by instances of a class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PropertyObservation {
    pub property: String,
    /// Objects of the property are literals
    pub is_literal: bool,
    /// The class instances are objects of the property, not subjects
    pub is_inverse: bool,
}

/// Observations grouped by class, in query result order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedSchema {
    classes: IndexMap<String, Vec<PropertyObservation>>,
}

impl ExtractedSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a class even when its instances have no other properties.
    pub fn add_class(&mut self, class: impl Into<String>) {
        self.classes.entry(class.into()).or_default();
    }

    pub fn push(&mut self, class: impl Into<String>, observation: PropertyObservation) {
        self.classes.entry(class.into()).or_default().push(observation);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PropertyObservation])> {
        self.classes
            .iter()
            .map(|(class, observations)| (class.as_str(), observations.as_slice()))
    }

    pub fn observations(&self, class: &str) -> Option<&[PropertyObservation]> {
        self.classes.get(class).map(Vec::as_slice)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn observation_count(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

pub struct SchemaExtractor {
    data_graph: String,
    ignored: Vec<String>,
}

impl SchemaExtractor {
    pub fn new(data_graph: impl Into<String>, ignored: Vec<String>) -> Self {
        Self {
            data_graph: data_graph.into(),
            ignored,
        }
    }

    pub fn query(&self) -> String {
        extraction_query(&self.data_graph, &self.ignored)
    }

    pub async fn extract(&self, store: &dyn GraphStore) -> Result<ExtractedSchema> {
        let results = store.select(&self.query()).await?;
        let mut schema = ExtractedSchema::new();
        for row in results.rows() {
            let binding = TypedBinding::new(row);
            let class = binding.get_iri("class")?;
            let property = binding.get_iri("property")?;
            let is_inverse = binding.get_bool("inverse")?;
            // typing rows only make the class known
            if property == rdf::TYPE.as_str() && !is_inverse {
                schema.add_class(class);
                continue;
            }
            schema.push(
                class,
                PropertyObservation {
                    property,
                    is_literal: binding.get_bool("data")?,
                    is_inverse,
                },
            );
        }
        tracing::debug!(
            graph = %self.data_graph,
            classes = schema.class_count(),
            observations = schema.observation_count(),
            "schema extracted"
        );
        Ok(schema)
    }
}

/// Query listing `(class, property, data, inverse)` for every typed resource
/// of `data_graph`, in both directions.
///
/// Forward rows keep `rdf:type` so that a class whose instances carry nothing
/// else still shows up; inverse `rdf:type` rows are dropped.
pub fn extraction_query(data_graph: &str, ignored: &[String]) -> String {
    let rdf_type = rdf::TYPE.as_str();
    let forward: Vec<&str> = ignored
        .iter()
        .map(String::as_str)
        .filter(|iri| *iri != rdf_type)
        .collect();
    let inverse: Vec<&str> = std::iter::once(rdf_type).chain(forward.iter().copied()).collect();

    format!(
        "SELECT DISTINCT ?class ?property ?data ?inverse\n\
         FROM <{data_graph}>\n\
         WHERE {{\n  \
           {{\n    \
             ?subject <{rdf_type}> ?class .\n    \
             ?subject ?property ?object .\n    \
             BIND(isLiteral(?object) AS ?data)\n    \
             BIND(false AS ?inverse)\n    \
             {}\n  \
           }}\n  \
           UNION\n  \
           {{\n    \
             ?object <{rdf_type}> ?class .\n    \
             ?subject ?property ?object .\n    \
             BIND(false AS ?data)\n    \
             BIND(true AS ?inverse)\n    \
             {}\n  \
           }}\n  \
           FILTER(isIRI(?class))\n\
         }}\n\
         ORDER BY ?class ?property ?inverse ?data",
        not_in(&forward),
        not_in(&inverse),
    )
}

fn not_in(excluded: &[&str]) -> String {
    if excluded.is_empty() {
        return String::new();
    }
    let list: Vec<String> = excluded.iter().map(|iri| format!("<{iri}>")).collect();
    format!("FILTER(?property NOT IN ({}))", list.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const DATA: &str = "http://ex.org/data/";

    #[test]
    fn query_excludes_ignored_properties_in_both_directions() {
        let query = extraction_query(DATA, &["http://ex.org/secret".to_string()]);
        assert!(query.contains("FROM <http://ex.org/data/>"));
        assert!(query.contains("FILTER(?property NOT IN (<http://ex.org/secret>))"));
        assert!(query.contains(
            "NOT IN (<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>, <http://ex.org/secret>)"
        ));

        let query = extraction_query(DATA, &[]);
        assert_eq!(query.matches("NOT IN").count(), 1);
    }

    #[tokio::test]
    async fn groups_observations_by_class() {
        let store = MemoryStore::new().unwrap();
        store
            .load_turtle(
                DATA,
                "@prefix : <http://ex.org/> .\n\
                 :a a :Person ; :name \"Alice\" ; :knows :b .\n\
                 :b a :Person .\n\
                 :c a :Dog ; :owner :a .",
            )
            .unwrap();

        let schema = SchemaExtractor::new(DATA, Vec::new())
            .extract(&store)
            .await
            .unwrap();

        assert_eq!(schema.class_count(), 2);
        let person = schema.observations("http://ex.org/Person").unwrap();
        assert!(person.contains(&PropertyObservation {
            property: "http://ex.org/name".to_string(),
            is_literal: true,
            is_inverse: false,
        }));
        assert!(person.contains(&PropertyObservation {
            property: "http://ex.org/knows".to_string(),
            is_literal: false,
            is_inverse: true,
        }));
        assert!(person.contains(&PropertyObservation {
            property: "http://ex.org/owner".to_string(),
            is_literal: false,
            is_inverse: true,
        }));
        assert!(
            person
                .iter()
                .all(|o| o.property != "http://www.w3.org/1999/02/22-rdf-syntax-ns#type")
        );
    }

    #[tokio::test]
    async fn ignored_properties_are_skipped_in_both_directions() {
        let store = MemoryStore::new().unwrap();
        store
            .load_turtle(
                DATA,
                "@prefix : <http://ex.org/> .\n\
                 :a a :Person ; :knows :b .\n\
                 :b a :Person .",
            )
            .unwrap();

        let schema = SchemaExtractor::new(DATA, vec!["http://ex.org/knows".to_string()])
            .extract(&store)
            .await
            .unwrap();
        assert_eq!(schema.class_count(), 1);
        assert_eq!(schema.observation_count(), 0);
    }

    #[test]
    fn schema_serializes_in_insertion_order() {
        let mut schema = ExtractedSchema::new();
        schema.add_class("http://ex.org/Thing");
        schema.push(
            "http://ex.org/Person",
            PropertyObservation {
                property: "http://ex.org/name".to_string(),
                is_literal: true,
                is_inverse: false,
            },
        );
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(
            json,
            r#"{"classes":{"http://ex.org/Thing":[],"http://ex.org/Person":[{"property":"http://ex.org/name","is_literal":true,"is_inverse":false}]}}"#
        );
    }

    #[tokio::test]
    async fn classes_with_only_typed_instances_are_kept() {
        let store = MemoryStore::new().unwrap();
        store
            .load_turtle(
                DATA,
                "@prefix : <http://ex.org/> .\n\
                 :x a :Thing .\n\
                 :a a :Person ; :name \"A\" .",
            )
            .unwrap();

        let schema = SchemaExtractor::new(
            DATA,
            vec!["http://www.w3.org/1999/02/22-rdf-syntax-ns#type".to_string()],
        )
        .extract(&store)
        .await
        .unwrap();
        assert_eq!(schema.class_count(), 2);
        assert_eq!(schema.observations("http://ex.org/Thing"), Some(&[][..]));
        assert_eq!(schema.observation_count(), 1);
    }
}
