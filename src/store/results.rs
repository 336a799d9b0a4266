//! SPARQL query results
//!
//! Remote stores answer with the SPARQL 1.1 JSON results format; the embedded
//! store produces solutions directly. Both end up as [`SelectResults`].

use crate::error::{Result, ShapesError};
use oxigraph::model::{BlankNode, Literal, NamedNode, Term};
use serde::Deserialize;
use std::collections::HashMap;

/// One solution: variable name to bound term. Unbound variables are absent.
pub type Row = HashMap<String, Term>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectResults {
    variables: Vec<String>,
    rows: Vec<Row>,
}

impl SelectResults {
    pub fn new(variables: Vec<String>, rows: Vec<Row>) -> Self {
        Self { variables, rows }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct JsonResults {
    #[serde(default)]
    head: JsonHead,
    results: Option<JsonBindings>,
    boolean: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JsonBindings {
    bindings: Vec<HashMap<String, JsonTerm>>,
}

#[derive(Debug, Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
    datatype: Option<String>,
}

impl JsonTerm {
    fn into_term(self) -> Result<Term> {
        let term = match self.kind.as_str() {
            "uri" => NamedNode::new(&self.value)
                .map_err(|e| malformed(format!("invalid IRI <{}>: {e}", self.value)))?
                .into(),
            "bnode" => BlankNode::new(&self.value)
                .map_err(|e| malformed(format!("invalid blank node _:{}: {e}", self.value)))?
                .into(),
            "literal" | "typed-literal" => match (self.lang, self.datatype) {
                (Some(lang), _) => Literal::new_language_tagged_literal(self.value, lang)
                    .map_err(|e| malformed(format!("invalid language tag: {e}")))?
                    .into(),
                (None, Some(datatype)) => {
                    let datatype = NamedNode::new(&datatype)
                        .map_err(|e| malformed(format!("invalid datatype <{datatype}>: {e}")))?;
                    Literal::new_typed_literal(self.value, datatype).into()
                }
                (None, None) => Literal::new_simple_literal(self.value).into(),
            },
            other => return Err(malformed(format!("unknown term type '{other}'"))),
        };
        Ok(term)
    }
}

fn malformed(message: String) -> ShapesError {
    ShapesError::MalformedResponse(message)
}

/// Parses a `application/sparql-results+json` SELECT response.
pub fn parse_select_json(body: &str) -> Result<SelectResults> {
    let parsed: JsonResults = serde_json::from_str(body)
        .map_err(|e| malformed(format!("invalid SPARQL JSON results: {e}")))?;
    let bindings = parsed
        .results
        .ok_or_else(|| malformed("SELECT response without results".to_string()))?;
    let mut rows = Vec::with_capacity(bindings.bindings.len());
    for binding in bindings.bindings {
        let mut row = Row::with_capacity(binding.len());
        for (var, term) in binding {
            row.insert(var, term.into_term()?);
        }
        rows.push(row);
    }
    Ok(SelectResults::new(parsed.head.vars, rows))
}

/// Parses a `application/sparql-results+json` ASK response.
pub fn parse_ask_json(body: &str) -> Result<bool> {
    let parsed: JsonResults = serde_json::from_str(body)
        .map_err(|e| malformed(format!("invalid SPARQL JSON results: {e}")))?;
    parsed
        .boolean
        .ok_or_else(|| malformed("ASK response without boolean".to_string()))
}
