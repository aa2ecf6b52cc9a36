//! General web search through SerpAPI's Google engine.

use anyhow::Result;
use scout_core::ToolError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{ensure_success, http_client, require_key, transport_error};

const SERVICE: &str = "serpapi";

/// One organic result. Order in the returned list is relevance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub snippet: String,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    snippet: Option<String>,
    link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    results: u32,
}

impl SearchClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)?;
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            language: "it".to_string(),
            results: 10,
        })
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_results(mut self, results: u32) -> Self {
        self.results = results;
        self
    }

    /// Snippets and source links of the top organic results.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::invalid("query is empty"));
        }
        require_key(SERVICE, &self.api_key)?;

        let url = format!("{}/search.json", self.base_url);
        let num = self.results.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("engine", "google"),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
                ("hl", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let body: SearchResponse = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if let Some(error) = body.error {
            if body.organic_results.is_empty() {
                return Err(ToolError::external(SERVICE, error));
            }
        }

        Ok(body
            .organic_results
            .into_iter()
            .filter_map(|r| {
                Some(SearchHit {
                    snippet: r.snippet?,
                    link: r.link,
                })
            })
            .collect())
    }
}
