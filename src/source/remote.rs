//! Remote source fetching over HTTP(S).
//!
//! A URL argument may carry request headers in its fragment, which is never
//! sent to the server:
//!
//! ```text
//! https://example.com/values.json#headers='Authorization: token abc','Accept: application/json'
//! ```
//!
//! Header entries are comma-separated, optionally single-quoted, each
//! `Name: value`. Malformed entries are skipped with a warning.

use anyhow::{Context, Result};
use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::core::SviError;

/// A URL argument split into the request URL and its headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl RemoteRequest {
    /// Parse a URL argument, extracting headers from its fragment.
    ///
    /// ```rust
    /// use svi_cli::source::RemoteRequest;
    ///
    /// let request = RemoteRequest::parse("https://host/v.json#headers='Accept: text/plain'");
    /// assert_eq!(request.url, "https://host/v.json");
    /// assert_eq!(request.headers, [("Accept".to_string(), "text/plain".to_string())]);
    /// ```
    pub fn parse(link: &str) -> Self {
        let Some((url, fragment)) = link.split_once('#') else {
            return Self {
                url: link.to_string(),
                headers: Vec::new(),
            };
        };

        let mut headers = Vec::new();
        for option in fragment.split('&') {
            let Some(("headers", raw)) = option.split_once('=') else {
                debug!("Ignoring fragment option '{}'", option);
                continue;
            };

            for entry in raw.split(',') {
                let entry = entry.trim();
                let entry = entry
                    .strip_prefix('\'')
                    .and_then(|e| e.strip_suffix('\''))
                    .unwrap_or(entry);

                match entry.split_once(':') {
                    Some((name, value)) if !name.trim().is_empty() => {
                        debug!("Adding header {}", name.trim());
                        headers.push((name.trim().to_string(), value.trim().to_string()));
                    }
                    _ => warn!("Header {} is not in the correct format", entry),
                }
            }
        }

        Self {
            url: url.to_string(),
            headers,
        }
    }
}

/// Fetches remote source documents.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
}

impl RemoteFetcher {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
        }
    }

    /// Fetch the body behind one URL argument.
    pub async fn fetch(&self, link: &str) -> Result<Vec<u8>> {
        let request = RemoteRequest::parse(link);
        debug!("Fetching {} with {} headers", request.url, request.headers.len());

        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| SviError::RemoteFetch {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SviError::RemoteFetch {
                url: request.url,
                reason: format!("HTTP {status}"),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from {}", request.url))?;
        Ok(body.to_vec())
    }

    /// Fetch all URLs concurrently; bodies are returned in input order.
    pub async fn fetch_all(&self, links: &[String]) -> Result<Vec<Vec<u8>>> {
        if links.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Sending {} requests concurrently", links.len());
        let bodies = try_join_all(links.iter().map(|link| self.fetch(link))).await?;
        debug!("Received {} responses", bodies.len());
        Ok(bodies)
    }
}

impl Default for RemoteFetcher {
    fn default() -> Self {
        Self::new()
    }
}
