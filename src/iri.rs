//! IRI validation and splitting helpers

use once_cell::sync::Lazy;
use oxigraph::model::NamedNode;
use regex::Regex;

static HTTP_IRI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/?#@]+(?:[/?#]\S*)?$").expect("valid regex"));

// RFC 8141: the namespace identifier is 2 to 32 characters.
static URN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:urn):[A-Za-z0-9][A-Za-z0-9-]{1,31}:\S+$").expect("valid regex")
});

/// Whether `value` is an absolute `http(s)` IRI with a host or a well-formed URN.
pub fn is_valid_uri(value: &str) -> bool {
    if NamedNode::new(value).is_err() {
        return false;
    }
    HTTP_IRI.is_match(value) || URN.is_match(value)
}

/// Splits an IRI into namespace and local name.
///
/// The local name is the longest trailing run of name characters that starts
/// with a letter or underscore. Returns `None` when there is no such run.
pub fn split_iri(iri: &str) -> Option<(&str, &str)> {
    let mut start = iri.len();
    for (idx, ch) in iri.char_indices().rev() {
        if is_name_char(ch) {
            start = idx;
        } else {
            break;
        }
    }
    let mut local = &iri[start..];
    while let Some(ch) = local.chars().next() {
        if is_name_start_char(ch) {
            break;
        }
        local = &local[ch.len_utf8()..];
    }
    if local.is_empty() {
        return None;
    }
    let namespace = &iri[..iri.len() - local.len()];
    if namespace.is_empty() {
        return None;
    }
    Some((namespace, local))
}

fn is_name_start_char(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | '\u{b7}')
}

/// Namespace under which shape identifiers of a catalog are minted.
pub fn shape_namespace(graph_iri: &str) -> String {
    if graph_iri.ends_with('/') || graph_iri.ends_with('#') {
        graph_iri.to_string()
    } else {
        format!("{graph_iri}/")
    }
}

/// Last path, fragment or colon separated segment of an IRI.
pub fn local_segment(iri: &str) -> &str {
    iri.rsplit(['/', '#', ':']).next().unwrap_or(iri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_graph_parameters() {
        assert!(is_valid_uri("https://example.org/graph"));
        assert!(is_valid_uri("http://localhost:8080/data/"));
        assert!(is_valid_uri("urn:isbn:9780134685991"));
        assert!(!is_valid_uri("https:/example.org/graph"));
        assert!(!is_valid_uri("urn:x:9780134685991"));
        assert!(!is_valid_uri("example.org/graph"));
        assert!(!is_valid_uri("https://example.org/a graph"));
        assert!(!is_valid_uri(""));
    }

    #[test]
    fn splits_slash_and_hash_namespaces() {
        assert_eq!(
            split_iri("http://ex.org/Person"),
            Some(("http://ex.org/", "Person"))
        );
        assert_eq!(
            split_iri("http://www.w3.org/2000/01/rdf-schema#label"),
            Some(("http://www.w3.org/2000/01/rdf-schema#", "label"))
        );
        assert_eq!(
            split_iri("http://ex.org/v1_2"),
            Some(("http://ex.org/", "v1_2"))
        );
    }

    #[test]
    fn leading_digits_move_into_namespace() {
        assert_eq!(
            split_iri("http://ex.org/12abc"),
            Some(("http://ex.org/12", "abc"))
        );
        assert_eq!(split_iri("http://ex.org/123"), None);
        assert_eq!(split_iri("http://ex.org/"), None);
    }

    #[test]
    fn shape_namespace_appends_slash() {
        assert_eq!(shape_namespace("http://ex.org/shapes"), "http://ex.org/shapes/");
        assert_eq!(shape_namespace("http://ex.org/shapes/"), "http://ex.org/shapes/");
        assert_eq!(shape_namespace("http://ex.org/shapes#"), "http://ex.org/shapes#");
    }

    #[test]
    fn local_segment_takes_last_part() {
        assert_eq!(local_segment("https://vocab.example/di/label"), "label");
        assert_eq!(local_segment("http://ex.org/p#import_shapes"), "import_shapes");
    }
}
