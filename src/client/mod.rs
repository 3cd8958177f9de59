//! Typed client for the discovery/indexing backend.
//!
//! Every endpoint returns JSON which is validated against a typed schema
//! before use: `decode` is a pure function from raw bytes to a typed value,
//! and a body that does not match the schema is a fetch error just like a
//! transport failure or a non-success status.

pub mod schema;

use crate::changelog::ChangeEvent;
use crate::multisig::SafeTransaction;
use schema::{ChainListEntry, DiscoverySnapshot, DiscoveryStatus, ProtocolState, TrackedApp};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("response body did not match schema: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Validate a raw response body against the schema for `T`.
///
/// Pure: no partial state is produced on failure.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FetchError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// GET `url` and decode the body against the schema for `T`.
pub async fn fetch_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
) -> Result<T, FetchError> {
    debug!(url = url, "fetching");
    let resp = http.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            status: resp.status(),
            url: url.to_string(),
        });
    }
    let body = resp.bytes().await?;
    decode(&body)
}

/// Client for the backend scan API. URL builders are public so the
/// pollers can re-derive a resource URL when the selection changes.
#[derive(Debug, Clone)]
pub struct ScanApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScanApiClient {
    /// `timeout` is the explicit per-request deadline applied to every fetch.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // --- URL builders ---

    pub fn discovery_url(&self) -> String {
        format!("{}/discovery", self.base_url)
    }

    pub fn chain_discovery_url(&self, chain: &str) -> String {
        format!("{}/discovery/{}", self.base_url, chain)
    }

    pub fn chains_url(&self) -> String {
        format!("{}/config/chains", self.base_url)
    }

    pub fn status_url(&self) -> String {
        format!("{}/status/discovery", self.base_url)
    }

    pub fn changelog_url(&self, chain: &str, address: &str) -> String {
        format!("{}/changelog/{}/{}", self.base_url, chain, address)
    }

    pub fn tracking_url(&self, chain: &str) -> String {
        format!("{}/tracking/{}", self.base_url, chain)
    }

    pub fn multisig_url(&self, chain: &str, address: &str) -> String {
        format!("{}/multisig/{}/{}", self.base_url, chain, address)
    }

    // --- On-demand fetches ---

    pub async fn discovery(&self) -> Result<DiscoverySnapshot, FetchError> {
        fetch_json(&self.http, &self.discovery_url()).await
    }

    pub async fn discovery_for(&self, chain: &str) -> Result<ProtocolState, FetchError> {
        fetch_json(&self.http, &self.chain_discovery_url(chain)).await
    }

    pub async fn chains(&self) -> Result<Vec<ChainListEntry>, FetchError> {
        fetch_json(&self.http, &self.chains_url()).await
    }

    pub async fn status(&self) -> Result<Vec<DiscoveryStatus>, FetchError> {
        fetch_json(&self.http, &self.status_url()).await
    }

    pub async fn changelog(
        &self,
        chain: &str,
        address: &str,
    ) -> Result<Vec<ChangeEvent>, FetchError> {
        fetch_json(&self.http, &self.changelog_url(chain, address)).await
    }

    pub async fn tracking(&self, chain: &str) -> Result<Vec<TrackedApp>, FetchError> {
        fetch_json(&self.http, &self.tracking_url(chain)).await
    }

    pub async fn multisig(
        &self,
        chain: &str,
        address: &str,
    ) -> Result<Vec<SafeTransaction>, FetchError> {
        fetch_json(&self.http, &self.multisig_url(chain, address)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_mismatched_shape() {
        let body = br#"{"name": 42}"#;
        let result = decode::<ChainListEntry>(body);
        assert!(matches!(result, Err(FetchError::Schema(_))));
    }

    #[test]
    fn decode_accepts_valid_chain_entry() {
        let body = br#"{"name": "ethereum", "visible": true}"#;
        let entry: ChainListEntry = decode(body).unwrap();
        assert_eq!(entry.name, "ethereum");
        assert!(entry.visible);
    }

    #[test]
    fn url_builders_join_paths() {
        let client = ScanApiClient::new(
            "https://scan.example.org/api/".to_string(),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(client.discovery_url(), "https://scan.example.org/api/discovery");
        assert_eq!(
            client.changelog_url("ethereum", "0xabc"),
            "https://scan.example.org/api/changelog/ethereum/0xabc"
        );
        assert_eq!(
            client.status_url(),
            "https://scan.example.org/api/status/discovery"
        );
    }
}
