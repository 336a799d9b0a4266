use crate::error::ShapesError;
use crate::iri::is_valid_uri;
use crate::shapes::{ExistingGraphPolicy, ProvenanceContext, prefixes::PREFIX_CC_URL};
use crate::store::{Session, StoreEndpoints};
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// RUN PARAMETERS
// =============================================================================

/// Parameters of one shape generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapesConfig {
    pub data_graph: String,
    pub shapes_graph: String,
    pub existing_graph: ExistingGraphPolicy,
    pub import_shapes: bool,
    pub prefix_cc: bool,
    pub ignore_properties: Vec<String>,
    pub provenance: bool,
    pub label: Option<String>,
}

impl ShapesConfig {
    pub fn new(data_graph: impl Into<String>, shapes_graph: impl Into<String>) -> Self {
        Self {
            data_graph: data_graph.into(),
            shapes_graph: shapes_graph.into(),
            existing_graph: ExistingGraphPolicy::default(),
            import_shapes: false,
            prefix_cc: false,
            ignore_properties: Vec::new(),
            provenance: false,
            label: None,
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if !is_valid_uri(&self.data_graph) {
            return Err(ShapesError::config(format!(
                "data graph IRI '{}' is not a valid URI",
                self.data_graph
            )));
        }
        if !is_valid_uri(&self.shapes_graph) {
            return Err(ShapesError::config(format!(
                "shapes graph IRI '{}' is not a valid URI",
                self.shapes_graph
            )));
        }
        if self.data_graph == self.shapes_graph {
            return Err(ShapesError::config(
                "shapes graph IRI cannot be the same as the data graph IRI",
            ));
        }
        if let Some(invalid) = self.ignore_properties.iter().find(|p| !is_valid_uri(p)) {
            return Err(ShapesError::config(format!(
                "ignored property '{invalid}' is not a valid URI"
            )));
        }
        Ok(())
    }

    /// Parameter values by name, as recorded in provenance.
    pub fn parameters(&self) -> BTreeMap<String, String> {
        let mut parameters = BTreeMap::from([
            ("data_graph_iri".to_string(), self.data_graph.clone()),
            ("shapes_graph_iri".to_string(), self.shapes_graph.clone()),
            ("existing_graph".to_string(), self.existing_graph.to_string()),
            ("import_shapes".to_string(), self.import_shapes.to_string()),
            ("prefix_cc".to_string(), self.prefix_cc.to_string()),
            ("ignore_properties".to_string(), self.ignore_properties.join("\n")),
            ("add_shapes_provenance".to_string(), self.provenance.to_string()),
        ]);
        if let Some(label) = &self.label {
            parameters.insert("label".to_string(), label.clone());
        }
        parameters
    }
}

/// Splits a newline separated ignore list, dropping blank lines.
pub fn parse_ignore_list(value: &str) -> crate::error::Result<Vec<String>> {
    let mut properties = Vec::new();
    for line in value.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !is_valid_uri(line) {
            return Err(ShapesError::config(format!(
                "ignored property '{line}' is not a valid URI"
            )));
        }
        if !properties.iter().any(|p| p == line) {
            properties.push(line.to_string());
        }
    }
    Ok(properties)
}

// =============================================================================
// APPLICATION CONFIG
// =============================================================================

/// Where the data comes from and where the catalog goes
#[derive(Debug, Clone)]
pub enum Transport {
    /// A remote platform speaking the SPARQL and graph store protocols
    Remote {
        endpoints: StoreEndpoints,
        session: Session,
    },
    /// A local RDF file loaded into the embedded store
    Local {
        data_file: PathBuf,
        output_file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub shapes: ShapesConfig,
    pub transport: Transport,
    pub request_timeout: Duration,
    pub project_prefixes: BTreeMap<String, String>,
    pub prefix_directory_url: String,
    pub provenance: Option<ProvenanceContext>,
}

impl AppConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            data_graph: cli_data_graph,
            shapes_graph: cli_shapes_graph,
            existing_graph: cli_existing_graph,
            import_shapes: cli_import_shapes,
            prefix_cc: cli_prefix_cc,
            ignore_properties: cli_ignore_properties,
            provenance: cli_provenance,
            label: cli_label,
            store_url: cli_store_url,
            access_token: cli_access_token,
            request_timeout_secs: cli_request_timeout_secs,
            project_prefixes: cli_project_prefixes,
            prefix_directory_url: cli_prefix_directory_url,
            metadata_graph: cli_metadata_graph,
            task_iri: cli_task_iri,
            data_file: cli_data_file,
            output_file: cli_output_file,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            data_graph: file_data_graph,
            shapes_graph: file_shapes_graph,
            existing_graph: file_existing_graph,
            import_shapes: file_import_shapes,
            prefix_cc: file_prefix_cc,
            ignore_properties: file_ignore_properties,
            provenance: file_provenance,
            label: file_label,
            store_url: file_store_url,
            access_token: file_access_token,
            request_timeout_secs: file_request_timeout_secs,
            project_prefixes: file_project_prefixes,
            prefix_directory_url: file_prefix_directory_url,
            metadata_graph: file_metadata_graph,
            task_iri: file_task_iri,
            data_file: file_data_file,
            output_file: file_output_file,
        } = file_config;

        let data_graph = cli_data_graph
            .or(file_data_graph)
            .context("a data graph IRI is required (--data-graph)")?;
        let shapes_graph = cli_shapes_graph
            .or(file_shapes_graph)
            .unwrap_or_else(|| default_shapes_graph(&data_graph));

        let ignore_properties = match cli_ignore_properties {
            Some(list) => parse_ignore_list(&list)?,
            None => match file_ignore_properties {
                Some(IgnoreList::Lines(list)) => parse_ignore_list(&list)?,
                Some(IgnoreList::Items(items)) => parse_ignore_list(&items.join("\n"))?,
                None => Vec::new(),
            },
        };

        let shapes = ShapesConfig {
            data_graph,
            shapes_graph,
            existing_graph: cli_existing_graph.or(file_existing_graph).unwrap_or_default(),
            import_shapes: cli_import_shapes.or(file_import_shapes).unwrap_or(false),
            prefix_cc: cli_prefix_cc.or(file_prefix_cc).unwrap_or(true),
            ignore_properties,
            provenance: cli_provenance.or(file_provenance).unwrap_or(false),
            label: cli_label
                .or(file_label)
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
        };
        shapes.validate()?;

        let store_url = cli_store_url.or(file_store_url);
        let data_file = cli_data_file.or(file_data_file);
        let output_file = cli_output_file.or(file_output_file);

        let transport = match (store_url, data_file) {
            (Some(_), Some(_)) => {
                anyhow::bail!("--store-url and --data-file are mutually exclusive")
            }
            (Some(url), None) => {
                anyhow::ensure!(
                    url.starts_with("http://") || url.starts_with("https://"),
                    "store URL {url:?} must be an http(s) URL"
                );
                anyhow::ensure!(
                    output_file.is_none(),
                    "--output-file is only supported with --data-file"
                );
                let session = match cli_access_token.or(file_access_token) {
                    Some(token) => Session::bearer(token),
                    None => Session::anonymous(),
                };
                Transport::Remote {
                    endpoints: StoreEndpoints::from_base(&url),
                    session,
                }
            }
            (None, Some(data_file)) => {
                anyhow::ensure!(
                    data_file.is_file(),
                    "data file {:?} does not exist",
                    data_file
                );
                Transport::Local {
                    data_file,
                    output_file,
                }
            }
            (None, None) => anyhow::bail!("either --store-url or --data-file is required"),
        };

        let request_timeout_secs = cli_request_timeout_secs
            .or(file_request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        anyhow::ensure!(request_timeout_secs > 0, "request timeout must be positive");

        let project_prefixes = match cli_project_prefixes {
            Some(path) => load_prefix_file(&path)?,
            None => match file_project_prefixes {
                Some(ProjectPrefixes::File(path)) => load_prefix_file(&path)?,
                Some(ProjectPrefixes::Table(table)) => table,
                None => BTreeMap::new(),
            },
        };
        for (prefix, namespace) in &project_prefixes {
            anyhow::ensure!(
                is_valid_uri(namespace),
                "namespace {namespace:?} of prefix {prefix:?} is not a valid URI"
            );
        }

        let provenance = if shapes.provenance {
            let metadata_graph = cli_metadata_graph
                .or(file_metadata_graph)
                .context("provenance requires --metadata-graph")?;
            let task_iri = cli_task_iri
                .or(file_task_iri)
                .context("provenance requires --task-iri")?;
            anyhow::ensure!(
                is_valid_uri(&metadata_graph) && is_valid_uri(&task_iri),
                "metadata graph and task IRI must be valid URIs"
            );
            Some(ProvenanceContext {
                metadata_graph,
                task_iri,
            })
        } else {
            None
        };

        Ok(Self {
            shapes,
            transport,
            request_timeout: Duration::from_secs(request_timeout_secs),
            project_prefixes,
            prefix_directory_url: cli_prefix_directory_url
                .or(file_prefix_directory_url)
                .unwrap_or_else(|| PREFIX_CC_URL.to_string()),
            provenance,
        })
    }
}

fn default_shapes_graph(data_graph: &str) -> String {
    format!("{}shapes/", crate::iri::shape_namespace(data_graph))
}

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "shapegen",
    about = "Generate SHACL shapes from the instance data of an RDF graph",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SHAPEGEN_DATA_GRAPH",
        value_name = "IRI",
        help = "Graph whose instance data is analyzed"
    )]
    pub data_graph: Option<String>,

    #[arg(
        long,
        env = "SHAPEGEN_SHAPES_GRAPH",
        value_name = "IRI",
        help = "Graph receiving the generated shapes (default: <data graph>/shapes/)"
    )]
    pub shapes_graph: Option<String>,

    #[arg(
        long,
        env = "SHAPEGEN_EXISTING_GRAPH",
        value_enum,
        ignore_case = true,
        value_name = "POLICY",
        help = "What to do if the shapes graph exists: add, replace or stop"
    )]
    pub existing_graph: Option<ExistingGraphPolicy>,

    #[arg(
        long,
        env = "SHAPEGEN_IMPORT_SHAPES",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        help = "Import the shapes graph into the central shapes catalog"
    )]
    pub import_shapes: Option<bool>,

    #[arg(
        long,
        env = "SHAPEGEN_PREFIX_CC",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        help = "Fetch namespace prefixes from prefix.cc instead of the bundled snapshot"
    )]
    pub prefix_cc: Option<bool>,

    #[arg(
        long,
        env = "SHAPEGEN_IGNORE_PROPERTIES",
        value_name = "IRIS",
        help = "Newline separated property IRIs to leave out of the shapes"
    )]
    pub ignore_properties: Option<String>,

    #[arg(
        long,
        env = "SHAPEGEN_PROVENANCE",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        help = "Record which task and parameters produced the shapes"
    )]
    pub provenance: Option<bool>,

    #[arg(
        long,
        env = "SHAPEGEN_LABEL",
        value_name = "TEXT",
        help = "Label of the shapes graph (default: Shapes for <data graph>)"
    )]
    pub label: Option<String>,

    #[arg(
        long,
        env = "SHAPEGEN_STORE_URL",
        value_name = "URL",
        help = "Base URL of the data platform"
    )]
    pub store_url: Option<String>,

    #[arg(
        long,
        env = "SHAPEGEN_ACCESS_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        help = "Bearer token for the data platform"
    )]
    pub access_token: Option<String>,

    #[arg(
        long,
        env = "SHAPEGEN_REQUEST_TIMEOUT_SECS",
        value_name = "SECS",
        help = "Timeout of each remote request",
        value_parser = clap::value_parser!(u64)
    )]
    pub request_timeout_secs: Option<u64>,

    #[arg(
        long,
        env = "SHAPEGEN_PROJECT_PREFIXES",
        value_name = "FILE",
        help = "Project prefix declarations (YAML or JSON map of prefix to namespace)"
    )]
    pub project_prefixes: Option<PathBuf>,

    #[arg(
        long,
        env = "SHAPEGEN_PREFIX_DIRECTORY_URL",
        value_name = "URL",
        help = "Remote prefix directory fetched when --prefix-cc is set"
    )]
    pub prefix_directory_url: Option<String>,

    #[arg(
        long,
        env = "SHAPEGEN_METADATA_GRAPH",
        value_name = "IRI",
        help = "Graph describing the running task, used for provenance"
    )]
    pub metadata_graph: Option<String>,

    #[arg(
        long,
        env = "SHAPEGEN_TASK_IRI",
        value_name = "IRI",
        help = "IRI of the running task, used for provenance"
    )]
    pub task_iri: Option<String>,

    #[arg(
        long,
        env = "SHAPEGEN_DATA_FILE",
        value_name = "FILE",
        help = "Analyze a local RDF file with the embedded store"
    )]
    pub data_file: Option<PathBuf>,

    #[arg(
        long,
        env = "SHAPEGEN_OUTPUT_FILE",
        value_name = "FILE",
        help = "Write the resulting shapes graph as N-Triples (with --data-file)"
    )]
    pub output_file: Option<PathBuf>,
}

// =============================================================================
// CONFIG FILES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IgnoreList {
    Lines(String),
    Items(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProjectPrefixes {
    File(PathBuf),
    Table(BTreeMap<String, String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    data_graph: Option<String>,
    shapes_graph: Option<String>,
    existing_graph: Option<ExistingGraphPolicy>,
    import_shapes: Option<bool>,
    prefix_cc: Option<bool>,
    ignore_properties: Option<IgnoreList>,
    provenance: Option<bool>,
    label: Option<String>,
    store_url: Option<String>,
    access_token: Option<String>,
    request_timeout_secs: Option<u64>,
    project_prefixes: Option<ProjectPrefixes>,
    prefix_directory_url: Option<String>,
    metadata_graph: Option<String>,
    task_iri: Option<String>,
    data_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    parse_file(path, "config")
}

/// Reads a `prefix -> namespace` map from a YAML or JSON file.
pub fn load_prefix_file(path: &Path) -> Result<BTreeMap<String, String>> {
    parse_file(path, "prefix")
}

/// Every failure here is a [`ShapesError::Configuration`], so a bad file
/// exits with the configuration code.
fn parse_file<T: serde::de::DeserializeOwned>(path: &Path, kind: &str) -> Result<T> {
    if !path.exists() {
        return Err(ShapesError::config(format!("{kind} file {path:?} does not exist")).into());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| ShapesError::config(format!("failed to read {kind} file {path:?}: {e}")))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
            ShapesError::config(format!("failed to parse YAML {kind} file {path:?}: {e}"))
        })?,
        "json" => serde_json::from_str(&contents).map_err(|e| {
            ShapesError::config(format!("failed to parse JSON {kind} file {path:?}: {e}"))
        })?,
        other => {
            return Err(
                ShapesError::config(format!("unsupported {kind} file extension: {other}")).into(),
            );
        }
    };
    Ok(parsed)
}
