//! SHACL shape synthesis
//!
//! Turns an [`ExtractedSchema`] into node and property shapes. Property
//! shapes are keyed by `(property, direction)` across the whole schema: a
//! property used by several classes yields one shape and one `sh:property`
//! link per class.

use super::extract::ExtractedSchema;
use super::identifier::ShapeIdentifier;
use super::names::NameResolver;
use crate::error::{Result, RunWarning};
use crate::iri::shape_namespace;
use crate::vocab::{NAME_LANGUAGE, dcterms, rdf, rdfs, sh, shui};
use oxigraph::model::{Graph, Literal, NamedNode, NamedNodeRef, TermRef, TripleRef};
use std::collections::{HashMap, HashSet};

/// Shapes produced by one synthesis run, not yet written anywhere
#[derive(Debug, Clone)]
pub struct ShapesGraph {
    pub iri: String,
    pub data_graph: String,
    pub graph: Graph,
    pub node_shapes: usize,
    pub property_shapes: usize,
    pub warnings: Vec<RunWarning>,
}

impl ShapesGraph {
    pub fn shape_count(&self) -> usize {
        self.node_shapes + self.property_shapes
    }
}

pub struct ShapeSynthesizer {
    shapes_graph: NamedNode,
    data_graph: NamedNode,
    namespace: String,
}

impl ShapeSynthesizer {
    /// Both IRIs are expected to be validated already.
    pub fn new(shapes_graph: &str, data_graph: &str) -> Self {
        Self {
            shapes_graph: NamedNode::new_unchecked(shapes_graph),
            data_graph: NamedNode::new_unchecked(data_graph),
            namespace: shape_namespace(shapes_graph),
        }
    }

    pub async fn synthesize(
        &self,
        schema: &ExtractedSchema,
        names: &NameResolver<'_>,
    ) -> Result<ShapesGraph> {
        let mut graph = Graph::new();
        let catalog = self.shapes_graph.as_ref();
        graph.insert(TripleRef::new(catalog, rdf::TYPE, shui::SHAPE_CATALOG));
        graph.insert(TripleRef::new(catalog, dcterms::SOURCE, self.data_graph.as_ref()));

        let mut node_shapes = HashSet::new();
        // property shape -> node kind it was emitted with
        let mut property_shapes: HashMap<ShapeIdentifier, bool> = HashMap::new();
        let mut mixed = HashSet::new();
        let mut warnings = Vec::new();

        for (class, observations) in schema.iter() {
            let node_id = ShapeIdentifier::for_class(class);
            let node = NamedNode::new_unchecked(node_id.iri(&self.namespace));
            if node_shapes.insert(node_id) {
                let name = named(&names.resolve(class, false).await?);
                let class = NamedNode::new_unchecked(class);
                graph.insert(TripleRef::new(node.as_ref(), rdf::TYPE, sh::NODE_SHAPE));
                graph.insert(TripleRef::new(node.as_ref(), sh::TARGET_CLASS, class.as_ref()));
                graph.insert(TripleRef::new(node.as_ref(), sh::NAME, name.as_ref()));
                graph.insert(TripleRef::new(node.as_ref(), rdfs::LABEL, name.as_ref()));
            }

            for observation in observations {
                let property_id =
                    ShapeIdentifier::for_property(&observation.property, observation.is_inverse);
                let shape = NamedNode::new_unchecked(property_id.iri(&self.namespace));

                match property_shapes.get(&property_id) {
                    Some(&is_literal) => {
                        if is_literal != observation.is_literal && mixed.insert(property_id) {
                            tracing::warn!(
                                property = %observation.property,
                                inverse = observation.is_inverse,
                                "property has literal and IRI objects, keeping first node kind"
                            );
                            warnings.push(RunWarning::MixedNodeKind {
                                property: observation.property.clone(),
                                inverse: observation.is_inverse,
                            });
                        }
                    }
                    None => {
                        property_shapes.insert(property_id, observation.is_literal);
                        let name = named(
                            &names
                                .resolve(&observation.property, observation.is_inverse)
                                .await?,
                        );
                        let path = NamedNode::new_unchecked(observation.property.as_str());
                        let kind = if observation.is_literal {
                            sh::LITERAL
                        } else {
                            sh::IRI
                        };
                        let yes = Literal::from(true);
                        let s = shape.as_ref();
                        graph.insert(TripleRef::new(s, rdf::TYPE, sh::PROPERTY_SHAPE));
                        graph.insert(TripleRef::new(s, sh::PATH, path.as_ref()));
                        graph.insert(TripleRef::new(s, sh::NODE_KIND, kind));
                        if observation.is_inverse {
                            graph.insert(TripleRef::new(s, shui::INVERSE_PATH, yes.as_ref()));
                        }
                        graph.insert(TripleRef::new(s, shui::SHOW_ALWAYS, yes.as_ref()));
                        graph.insert(TripleRef::new(s, sh::NAME, name.as_ref()));
                        graph.insert(TripleRef::new(s, rdfs::LABEL, name.as_ref()));
                    }
                }
                graph.insert(TripleRef::new(node.as_ref(), sh::PROPERTY, shape.as_ref()));
            }
        }

        let (lookups, hits) = names.stats();
        tracing::info!(
            node_shapes = node_shapes.len(),
            property_shapes = property_shapes.len(),
            triples = graph.len(),
            title_lookups = lookups,
            title_cache_hits = hits,
            "shapes synthesized"
        );

        Ok(ShapesGraph {
            iri: self.shapes_graph.as_str().to_string(),
            data_graph: self.data_graph.as_str().to_string(),
            graph,
            node_shapes: node_shapes.len(),
            property_shapes: property_shapes.len(),
            warnings,
        })
    }
}

fn named(name: &str) -> Literal {
    Literal::new_language_tagged_literal_unchecked(name, NAME_LANGUAGE)
}

/// Subjects of `rdf:type <class>` in `graph`.
pub fn shapes_of_type(graph: &Graph, class: NamedNodeRef<'_>) -> Vec<String> {
    let mut subjects: Vec<String> = graph
        .iter()
        .filter(|t| t.predicate == rdf::TYPE && t.object == TermRef::from(class))
        .map(|t| t.subject.to_string())
        .collect();
    subjects.sort();
    subjects
}
