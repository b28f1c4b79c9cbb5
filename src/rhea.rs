//! Rhea SPARQL endpoint client and result rendering.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, ACCEPT};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://sparql.rhea-db.org/sparql";
pub const RHEA_NAMESPACE: &str = "http://rdf.rhea-db.org/";
const RESULTS_FORMAT: &str = "application/json";
const RULE: &str = "---------------------------------------------";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to reach SPARQL endpoint {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("SPARQL endpoint returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("SPARQL endpoint returned invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RheaMatch {
    pub id: String,
    pub equation: String,
}

#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<Binding>,
}

#[derive(Deserialize)]
struct Binding {
    reaction: Term,
    #[serde(rename = "reactionEquation")]
    reaction_equation: Term,
}

#[derive(Deserialize)]
struct Term {
    value: String,
}

pub struct RheaClient {
    client: Client,
    endpoint: String,
}

impl RheaClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build http client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Run a compact query and decode the matching reactions.
    pub fn search(&self, query: &str) -> Result<Vec<RheaMatch>, ReportError> {
        let transport = |source| ReportError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        };
        debug!(endpoint = %self.endpoint, query, "querying Rhea");
        let resp = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, HeaderValue::from_static(RESULTS_FORMAT))
            .query(&[("query", query), ("format", RESULTS_FORMAT)])
            .send()
            .map_err(transport)?;
        let status = resp.status();
        let body = resp.text().map_err(transport)?;
        if !status.is_success() {
            return Err(ReportError::Status { status, body });
        }
        parse_results(&body)
    }
}

/// Decode a SPARQL JSON result document.
pub fn parse_results(body: &str) -> Result<Vec<RheaMatch>, ReportError> {
    let response: SparqlResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .bindings
        .into_iter()
        .map(|binding| RheaMatch {
            id: binding
                .reaction
                .value
                .strip_prefix(RHEA_NAMESPACE)
                .map(str::to_string)
                .unwrap_or(binding.reaction.value),
            equation: binding.reaction_equation.value,
        })
        .collect())
}

pub fn render_report(matches: &[RheaMatch]) -> String {
    let lines: String = matches
        .iter()
        .map(|found| format!("{:>10}: {}\n", found.id, found.equation))
        .collect();
    format!("{RULE}\nRhea: {} results\n{lines}{RULE}\n\n", matches.len())
}

pub fn render_failure(error: &dyn std::fmt::Display) -> String {
    format!("{RULE}\nRhea: query failed: {error}\n{RULE}\n\n")
}
