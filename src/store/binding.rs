//! Typed access to result rows

use super::results::Row;
use crate::error::ShapesError;
use oxigraph::model::Term;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingError {
    #[error("variable ?{0} is unbound")]
    Unbound(String),

    #[error("expected {expected} for ?{var}, got {actual}")]
    TypeMismatch {
        var: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("bad literal for ?{var}: {reason}")]
    LiteralValueError { var: String, reason: String },
}

impl From<BindingError> for ShapesError {
    fn from(error: BindingError) -> Self {
        ShapesError::MalformedResponse(error.to_string())
    }
}

/// Typed view over one result row
pub struct TypedBinding<'a> {
    row: &'a Row,
}

impl<'a> TypedBinding<'a> {
    pub fn new(row: &'a Row) -> Self {
        Self { row }
    }

    pub fn get_iri(&self, var: &str) -> Result<String, BindingError> {
        self.get_iri_opt(var)?
            .ok_or_else(|| BindingError::Unbound(var.to_string()))
    }

    pub fn get_iri_opt(&self, var: &str) -> Result<Option<String>, BindingError> {
        self.project(var, "IRI", |term| match term {
            Term::NamedNode(node) => Some(node.as_str().to_string()),
            _ => None,
        })
    }

    pub fn get_literal_opt(&self, var: &str) -> Result<Option<String>, BindingError> {
        self.project(var, "Literal", |term| match term {
            Term::Literal(literal) => Some(literal.value().to_string()),
            _ => None,
        })
    }

    /// Reads a flag bound by `BIND(isLiteral(..))` or a constant.
    ///
    /// Stores differ in how they serialize it, so `true`/`false` and `1`/`0`
    /// are accepted in any case.
    pub fn get_bool(&self, var: &str) -> Result<bool, BindingError> {
        let lexical = self
            .project(var, "boolean literal", |term| match term {
                Term::Literal(literal) => Some(literal.value().to_ascii_lowercase()),
                _ => None,
            })?
            .ok_or_else(|| BindingError::Unbound(var.to_string()))?;
        match lexical.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(BindingError::LiteralValueError {
                var: var.to_string(),
                reason: format!("'{other}' is not a boolean"),
            }),
        }
    }

    fn project<T>(
        &self,
        var: &str,
        expected: &'static str,
        pick: impl FnOnce(&Term) -> Option<T>,
    ) -> Result<Option<T>, BindingError> {
        let Some(term) = self.row.get(var) else {
            return Ok(None);
        };
        pick(term).map(Some).ok_or_else(|| BindingError::TypeMismatch {
            var: var.to_string(),
            expected,
            actual: term_type_name(term),
        })
    }
}

fn term_type_name(term: &Term) -> &'static str {
    match term {
        Term::NamedNode(_) => "IRI",
        Term::BlankNode(_) => "blank node",
        Term::Literal(_) => "Literal",
        #[allow(unreachable_patterns)]
        _ => "quoted triple",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{Literal, NamedNode, vocab::xsd};

    fn row(pairs: &[(&str, Term)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn reads_iris_and_booleans() {
        let row = row(&[
            ("class", NamedNode::new_unchecked("http://ex.org/Person").into()),
            ("data", Literal::new_typed_literal("true", xsd::BOOLEAN).into()),
            ("inverse", Literal::new_simple_literal("False").into()),
        ]);
        let binding = TypedBinding::new(&row);
        assert_eq!(binding.get_iri("class").unwrap(), "http://ex.org/Person");
        assert!(binding.get_bool("data").unwrap());
        assert!(!binding.get_bool("inverse").unwrap());
    }

    #[test]
    fn reports_type_mismatch_and_unbound() {
        let row = row(&[("class", Literal::new_simple_literal("Person").into())]);
        let binding = TypedBinding::new(&row);
        assert_eq!(
            binding.get_iri("class"),
            Err(BindingError::TypeMismatch {
                var: "class".to_string(),
                expected: "IRI",
                actual: "Literal",
            })
        );
        assert_eq!(
            binding.get_bool("data"),
            Err(BindingError::Unbound("data".to_string()))
        );
        assert_eq!(binding.get_iri_opt("missing"), Ok(None));
    }

    #[test]
    fn rejects_non_boolean_literal() {
        let row = row(&[("data", Literal::new_simple_literal("maybe").into())]);
        let err = TypedBinding::new(&row).get_bool("data").unwrap_err();
        assert!(matches!(err, BindingError::LiteralValueError { .. }));
    }
}
