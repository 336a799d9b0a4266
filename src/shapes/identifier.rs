//! Content-derived shape identifiers
//!
//! Shapes are keyed by a UUID v5 over the class or property IRI, so running
//! the generator twice over the same data mints the same shape IRIs and the
//! catalog converges instead of accumulating duplicates.

use std::fmt;
use uuid::Uuid;

/// Suffix that separates the inverse shape of a property from its forward shape.
const INVERSE_SUFFIX: &str = "inverse";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeIdentifier(Uuid);

impl ShapeIdentifier {
    pub fn for_class(class: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, class.as_bytes()))
    }

    pub fn for_property(property: &str, inverse: bool) -> Self {
        if inverse {
            let key = format!("{property}{INVERSE_SUFFIX}");
            Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()))
        } else {
            Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, property.as_bytes()))
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Shape IRI under a namespace produced by [`crate::iri::shape_namespace`].
    pub fn iri(&self, namespace: &str) -> String {
        format!("{namespace}{}", self.0)
    }
}

impl fmt::Display for ShapeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
