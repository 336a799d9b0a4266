//! Remote graph store client
//!
//! Speaks the SPARQL 1.1 protocol for queries and updates, the SPARQL 1.1
//! graph store protocol (N-Triples bodies) for bulk reads and writes, and a
//! `GET title?resource=<iri>` endpoint for resource titles.

use super::results::{SelectResults, parse_ask_json, parse_select_json};
use super::{GraphStore, Title, TitleService, WriteMode, to_ntriples};
use crate::error::{Result, ShapesError};
use async_trait::async_trait;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{Graph, Triple};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const N_TRIPLES: &str = "application/n-triples";

/// Endpoint URLs of a platform deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEndpoints {
    pub query: String,
    pub update: String,
    pub graph_store: String,
    pub title: String,
}

impl StoreEndpoints {
    /// Derives the endpoint layout of a data platform rooted at `base`.
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            query: format!("{base}/proxy/default/sparql"),
            update: format!("{base}/proxy/default/update"),
            graph_store: format!("{base}/proxy/default/graph"),
            title: format!("{base}/api/explore/title"),
        }
    }
}

/// Credentials attached to every request.
///
/// Passed explicitly to the clients that need it; nothing is read from
/// process-wide state at request time.
#[derive(Clone, Default)]
pub struct Session {
    access_token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { access_token: None }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ShapesError::upstream("http client", e))
}

/// Fails with the response status and body unless the request succeeded.
async fn check(service: &'static str, response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ShapesError::upstream_status(service, status, body))
}

#[derive(Debug, Clone)]
pub struct HttpGraphStore {
    client: reqwest::Client,
    endpoints: StoreEndpoints,
    session: Session,
}

impl HttpGraphStore {
    pub fn new(client: reqwest::Client, endpoints: StoreEndpoints, session: Session) -> Self {
        Self {
            client,
            endpoints,
            session,
        }
    }

    async fn post_query(&self, query: &str) -> Result<String> {
        tracing::debug!(endpoint = %self.endpoints.query, "sparql query");
        let request = self
            .client
            .post(&self.endpoints.query)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)]);
        let response = self.session.authorize(request).send().await?;
        let response = check("sparql query", response).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn select(&self, query: &str) -> Result<SelectResults> {
        parse_select_json(&self.post_query(query).await?)
    }

    async fn ask(&self, query: &str) -> Result<bool> {
        parse_ask_json(&self.post_query(query).await?)
    }

    async fn update(&self, update: &str) -> Result<()> {
        tracing::debug!(endpoint = %self.endpoints.update, "sparql update");
        let request = self
            .client
            .post(&self.endpoints.update)
            .form(&[("update", update)]);
        let response = self.session.authorize(request).send().await?;
        check("sparql update", response).await?;
        Ok(())
    }

    async fn read_graph(&self, graph: &str) -> Result<Graph> {
        let request = self
            .client
            .get(&self.endpoints.graph_store)
            .query(&[("graph", graph)])
            .header(ACCEPT, N_TRIPLES);
        let response = self.session.authorize(request).send().await?;
        let body = check("graph store", response).await?.bytes().await?;

        let mut out = Graph::new();
        for quad in RdfParser::from_format(RdfFormat::NTriples).for_reader(body.as_ref()) {
            let quad = quad.map_err(|e| ShapesError::MalformedResponse(e.to_string()))?;
            out.insert(&Triple::from(quad));
        }
        Ok(out)
    }

    async fn write_graph(&self, graph: &str, triples: &Graph, mode: WriteMode) -> Result<()> {
        let request = match mode {
            WriteMode::Replace => self.client.put(&self.endpoints.graph_store),
            WriteMode::Append => self.client.post(&self.endpoints.graph_store),
        }
        .query(&[("graph", graph)])
        .header(CONTENT_TYPE, N_TRIPLES)
        .body(to_ntriples(triples));
        tracing::debug!(graph, ?mode, triples = triples.len(), "graph store write");
        let response = self.session.authorize(request).send().await?;
        check("graph store", response).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpTitleService {
    client: reqwest::Client,
    endpoint: String,
    session: Session,
}

impl HttpTitleService {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, session: Session) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            session,
        }
    }
}

#[async_trait]
impl TitleService for HttpTitleService {
    async fn title(&self, iri: &str) -> Result<Title> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("resource", iri)])
            .header(ACCEPT, "application/json");
        let response = self.session.authorize(request).send().await?;
        let response = check("title", response).await?;
        response
            .json::<Title>()
            .await
            .map_err(|e| ShapesError::MalformedResponse(format!("title of <{iri}>: {e}")))
    }
}
