//! Namespace prefix resolution
//!
//! Builds the [`PrefixTable`] used to compact names: a prefix directory
//! (remote `prefix.cc` export or the bundled snapshot of it) overlaid with
//! the project's own prefix declarations.

use crate::error::{Result, RunWarning, ShapesError};
use std::collections::{BTreeMap, HashMap};

/// Default remote prefix directory.
pub const PREFIX_CC_URL: &str = "http://prefix.cc/popular/all.file.json";

static BUNDLED_DIRECTORY: &str = include_str!("prefix.cc.json");

/// Namespace IRI to candidate compact prefixes (`"foaf:"`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixTable {
    entries: BTreeMap<String, Vec<String>>,
    preferred: HashMap<String, String>,
}

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a `prefix -> namespace` directory.
    pub fn from_directory(directory: &BTreeMap<String, String>) -> Self {
        let mut table = Self::new();
        for (prefix, namespace) in directory {
            table.add(namespace, prefix);
        }
        table
    }

    /// Appends `prefix` to the candidates of `namespace`, ignoring duplicates.
    pub fn add(&mut self, namespace: &str, prefix: &str) {
        let candidate = format!("{}:", prefix.trim_end_matches(':'));
        let candidates = self.entries.entry(namespace.to_string()).or_default();
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    /// Appends a project prefix; project prefixes are preferred for display.
    pub fn add_project(&mut self, namespace: &str, prefix: &str) {
        self.add(namespace, prefix);
        self.preferred
            .insert(namespace.to_string(), format!("{}:", prefix.trim_end_matches(':')));
    }

    pub fn candidates(&self, namespace: &str) -> Option<&[String]> {
        self.entries
            .get(namespace)
            .map(Vec::as_slice)
            .filter(|c| !c.is_empty())
    }

    /// The candidate shown when a title carries no prefix of its own.
    pub fn preferred(&self, namespace: &str) -> Option<&str> {
        self.preferred
            .get(namespace)
            .map(String::as_str)
            .or_else(|| self.candidates(namespace)?.first().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The `prefix.cc` snapshot compiled into the binary.
pub fn bundled_directory() -> Result<BTreeMap<String, String>> {
    serde_json::from_str(BUNDLED_DIRECTORY)
        .map_err(|e| ShapesError::config(format!("bundled prefix directory is invalid: {e}")))
}

#[derive(Debug)]
pub struct PrefixResolution {
    pub table: PrefixTable,
    pub warning: Option<RunWarning>,
}

#[derive(Debug, Clone)]
struct RemoteDirectory {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Clone, Default)]
pub struct PrefixResolver {
    project: BTreeMap<String, String>,
    remote: Option<RemoteDirectory>,
}

impl PrefixResolver {
    /// `project` maps prefix to namespace.
    pub fn new(project: BTreeMap<String, String>) -> Self {
        Self {
            project,
            remote: None,
        }
    }

    /// Fetch the directory from `url` instead of using the bundled snapshot.
    pub fn with_remote(mut self, client: reqwest::Client, url: impl Into<String>) -> Self {
        self.remote = Some(RemoteDirectory {
            client,
            url: url.into(),
        });
        self
    }

    pub async fn resolve(&self) -> Result<PrefixResolution> {
        let mut warning = None;
        let directory = match &self.remote {
            Some(remote) => match fetch_directory(remote).await {
                Ok(directory) => {
                    tracing::info!(url = %remote.url, prefixes = directory.len(), "prefixes fetched");
                    directory
                }
                Err(reason) => {
                    tracing::warn!(url = %remote.url, %reason, "failed to fetch prefixes, using bundled snapshot");
                    warning = Some(RunWarning::PrefixDirectoryUnavailable { reason });
                    bundled_directory()?
                }
            },
            None => bundled_directory()?,
        };

        let mut table = PrefixTable::from_directory(&directory);
        for (prefix, namespace) in &self.project {
            table.add_project(namespace, prefix);
        }
        tracing::debug!(
            namespaces = table.len(),
            project_prefixes = self.project.len(),
            "prefix table resolved"
        );
        Ok(PrefixResolution { table, warning })
    }
}

async fn fetch_directory(
    remote: &RemoteDirectory,
) -> std::result::Result<BTreeMap<String, String>, String> {
    let response = remote
        .client
        .get(&remote.url)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("status {}", response.status()));
    }
    response
        .json::<BTreeMap<String, String>>()
        .await
        .map_err(|e| e.to_string())
}
