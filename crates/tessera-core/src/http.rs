//! HTTP data endpoints
//!
//! Endpoint sources issue a GET against `{base}/{endpoint}` with the query
//! descriptor flattened into query-string parameters, and expect an
//! [`ApiResponse`] envelope back.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use tessera_api::{ApiResponse, QueryDescriptor};

use crate::error::StoreError;
use crate::traits::{EndpointClient, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Flatten a query into endpoint query-string pairs.
///
/// Unset fields are omitted so endpoint defaults stay in effect. `where` is
/// sent as compact JSON, list fields are comma-joined.
pub fn encode_endpoint_params(
    collection: Option<&str>,
    query: Option<&QueryDescriptor>,
) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut push = |key: &str, value: String| params.push((key.to_string(), value));

    if let Some(collection) = collection.filter(|c| !c.is_empty()) {
        push("collection", collection.to_string());
    }
    let Some(query) = query else {
        return params;
    };
    if let Some(page) = query.page {
        push("page", page.to_string());
    }
    if let Some(limit) = query.limit {
        push("limit", limit.to_string());
    }
    if let Some(depth) = query.depth {
        push("depth", depth.to_string());
    }
    if let Some(sort) = query.sort.as_deref().filter(|s| !s.is_empty()) {
        push("sort", sort.to_string());
    }
    if let Some(filter) = &query.filter {
        push("where", filter.to_string());
    }
    for (key, list) in [
        ("select", &query.select),
        ("searchFields", &query.search_fields),
        ("populate", &query.populate),
    ] {
        if let Some(list) = list.as_ref().filter(|l| !l.is_empty()) {
            push(key, list.join(","));
        }
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        push("search", search.to_string());
    }
    params
}

/// [`EndpointClient`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpEndpointClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpEndpointClient {
    pub fn new(base_url: &str) -> std::result::Result<Self, StoreError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> std::result::Result<Self, StoreError> {
        // Url::join drops the last segment unless the base ends with a slash
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|e| StoreError::Transport(format!("invalid base url `{base_url}`: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Full request URL for an endpoint path and its parameters.
    pub fn endpoint_url(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> std::result::Result<Url, StoreError> {
        let mut url = self
            .base
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| StoreError::Endpoint {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

#[async_trait]
impl EndpointClient for HttpEndpointClient {
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<ApiResponse> {
        let url = self.endpoint_url(endpoint, params)?;
        debug!("[HttpEndpointClient] GET {}", url);

        let endpoint_error = |message: String| StoreError::Endpoint {
            endpoint: endpoint.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(endpoint_error(format!("HTTP {status}")).into()),
            Err(e) => Err(endpoint_error(format!("malformed response: {e}")).into()),
        }
    }
}
