//! Vocabulary terms written into shape catalogs
//!
//! `rdf`, `rdfs` and `xsd` come from oxigraph; the rest are declared here.

pub use oxigraph::model::vocab::{rdf, rdfs, xsd};

pub mod sh {
    //! [SHACL](http://www.w3.org/ns/shacl#) terms.
    use oxigraph::model::NamedNodeRef;

    pub const NS: &str = "http://www.w3.org/ns/shacl#";

    pub const NODE_SHAPE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#NodeShape");
    pub const PROPERTY_SHAPE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#PropertyShape");
    pub const TARGET_CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#targetClass");
    pub const PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#property");
    pub const PATH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#path");
    pub const NODE_KIND: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#nodeKind");
    pub const NAME: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#name");
    pub const IRI: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#IRI");
    pub const LITERAL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#Literal");
}

pub mod shui {
    //! Shape UI extension vocabulary used by the catalog consumer.
    use oxigraph::model::NamedNodeRef;

    pub const NS: &str = "https://vocab.eccenca.com/shui/";

    pub const SHAPE_CATALOG: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://vocab.eccenca.com/shui/ShapeCatalog");
    pub const INVERSE_PATH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://vocab.eccenca.com/shui/inversePath");
    pub const SHOW_ALWAYS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://vocab.eccenca.com/shui/showAlways");
}

pub mod dcterms {
    use oxigraph::model::NamedNodeRef;

    pub const NS: &str = "http://purl.org/dc/terms/";

    pub const SOURCE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/source");
    pub const CREATED: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/created");
    pub const MODIFIED: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/modified");
    pub const CREATOR: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/creator");
}

pub mod owl {
    use oxigraph::model::NamedNodeRef;

    pub const IMPORTS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#imports");
}

pub mod prov {
    use oxigraph::model::NamedNodeRef;

    pub const WAS_ASSOCIATED_WITH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/prov#wasAssociatedWith");
}

pub mod skos {
    use oxigraph::model::NamedNodeRef;

    pub const PREF_LABEL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#prefLabel");
}

pub mod di {
    //! Workspace metadata vocabulary describing tasks and their parameters.
    use oxigraph::model::NamedNodeRef;

    pub const PLUGIN_PARAMETER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://vocab.eccenca.com/di/PluginParameter");
    pub const PARAMETER_OF: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://vocab.eccenca.com/di/parameterOf");
}

/// Graph that aggregates shape catalogs through `owl:imports`.
pub const CENTRAL_SHAPES_CATALOG: &str = "https://vocab.eccenca.com/shacl/";

/// Language tag for names and labels.
pub const NAME_LANGUAGE: &str = "en";
