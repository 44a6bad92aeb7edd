//! HTTP client for symbol search.

use crate::error::{SuggestError, SuggestResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use stockassist_core::SuggestionCandidate;
use tracing::debug;
use url::Url;

/// Default timeout for suggestion requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of raw suggestion candidates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SuggestSource: Send + Sync {
    /// Fetch unranked candidates for `term`.
    async fn fetch(&self, term: &str) -> SuggestResult<Vec<SuggestionCandidate>>;
}

/// `GET /api/stock/suggest/{term}` client.
pub struct SuggestClient {
    client: Client,
    base_url: Url,
}

impl SuggestClient {
    pub fn new(base_url: &str) -> SuggestResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SuggestError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Self::with_client(client, base_url)
    }

    /// Share an existing HTTP client (connection pool, cookies).
    pub fn with_client(client: Client, base_url: &str) -> SuggestResult<Self> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }

    fn suggest_url(&self, term: &str) -> SuggestResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SuggestError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "stock", "suggest", term]);
        Ok(url)
    }
}

fn parse_base_url(base_url: &str) -> SuggestResult<Url> {
    let url =
        Url::parse(base_url).map_err(|e| SuggestError::InvalidUrl(format!("{base_url}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(SuggestError::InvalidUrl(url.to_string()));
    }
    Ok(url)
}

#[async_trait]
impl SuggestSource for SuggestClient {
    async fn fetch(&self, term: &str) -> SuggestResult<Vec<SuggestionCandidate>> {
        let url = self.suggest_url(term)?;
        debug!(%url, "Fetching suggestions");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SuggestError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SuggestError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SuggestError::HttpClient(format!("Failed to read response: {e}")))?;
        let candidates: Vec<SuggestionCandidate> = serde_json::from_str(&body)?;

        debug!(count = candidates.len(), "Suggestions received");
        Ok(candidates)
    }
}
