//! Discovery of page targets exposed by a remote debugging endpoint.
//!
//! Failures never reach the caller: an unreachable endpoint or an
//! unparseable reply yields an empty target list and a warning in the log.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of characters in a display label.
pub const MAX_LABEL_CHARS: usize = 180;

/// Between title and URL in a display label.
pub const LABEL_SEPARATOR: &str = " \u{2014} ";

/// Discovery errors. Only surfaced in logs.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid target list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Entry of `GET <endpoint>/json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugTarget {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    web_socket_debugger_url: Option<String>,
}

/// A page that can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabTarget {
    pub label: String,
    pub socket_url: String,
}

/// Client for the debugging endpoint's target list.
#[derive(Clone)]
pub struct TabDiscovery {
    client: reqwest::Client,
}

impl TabDiscovery {
    /// Create a discovery client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Page targets of `endpoint`, in the order the endpoint reports them.
    pub async fn list_targets(&self, endpoint: &str) -> Vec<TabTarget> {
        if endpoint.trim().is_empty() {
            return Vec::new();
        }

        match self.fetch(endpoint).await {
            Ok(targets) => {
                let pages = pages(targets);
                debug!(endpoint = %endpoint, pages = pages.len(), "Fetched debug targets");
                pages
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Failed to fetch debug targets");
                Vec::new()
            }
        }
    }

    /// Map a label from a previous listing back to its socket URL.
    ///
    /// Re-queries the endpoint, so a target that disappeared or got
    /// retitled in between no longer resolves.
    pub async fn resolve(&self, label: &str, endpoint: &str) -> Option<String> {
        self.list_targets(endpoint)
            .await
            .into_iter()
            .find(|t| t.label == label)
            .map(|t| t.socket_url)
    }

    async fn fetch(&self, endpoint: &str) -> Result<Vec<DebugTarget>, DiscoveryError> {
        let url = format!("{}/json", endpoint.trim().trim_end_matches('/'));
        debug!(url = %url, "GET request");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Status(response.status()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn pages(targets: Vec<DebugTarget>) -> Vec<TabTarget> {
    targets
        .into_iter()
        .filter(|t| t.kind.as_deref() == Some("page"))
        .filter_map(|t| {
            let socket_url = t.web_socket_debugger_url.filter(|ws| !ws.is_empty())?;
            let label = label(t.title.as_deref(), t.url.as_deref());
            Some(TabTarget { label, socket_url })
        })
        .collect()
}

fn label(title: Option<&str>, url: Option<&str>) -> String {
    let title = title.filter(|t| !t.is_empty()).unwrap_or("(no title)");
    let url = url.unwrap_or_default();
    format!("{}{}{}", title, LABEL_SEPARATOR, url)
        .chars()
        .take(MAX_LABEL_CHARS)
        .collect()
}
