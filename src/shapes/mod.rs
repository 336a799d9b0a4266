//! Shape inference
//!
//! Prefixes and the extracted schema feed the synthesizer; the synthesized
//! graph is handed to the catalog reconciler, which owns all writes.

pub mod catalog;
pub mod extract;
pub mod identifier;
pub mod names;
pub mod prefixes;
pub mod provenance;
pub mod synth;

pub use catalog::{
    CatalogOutcome, CatalogReconciler, ExistingGraphPolicy, Reconciliation, ensure_imported,
};
pub use extract::{ExtractedSchema, PropertyObservation, SchemaExtractor};
pub use identifier::ShapeIdentifier;
pub use names::NameResolver;
pub use prefixes::{PrefixResolution, PrefixResolver, PrefixTable};
pub use provenance::{Provenance, ProvenanceAnnotator, ProvenanceContext};
pub use synth::{ShapeSynthesizer, ShapesGraph};
