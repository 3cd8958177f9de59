//! Response schemas for the backend scan API.
//!
//! These structs are the schema contract: a response body either
//! deserializes into one of them or the fetch is treated as failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chain the UI may offer, from `config/chains`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainListEntry {
    pub name: String,
    /// Hidden chains are indexed but not offered in the selector.
    #[serde(default)]
    pub visible: bool,
}

/// Indexing health for one chain, from `status/discovery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryStatus {
    pub chain: String,
    pub last_indexed_block: u64,
    pub latest_block: u64,
    pub health: IndexerHealth,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexerHealth {
    Healthy,
    Lagging,
    Stalled,
}

impl std::fmt::Display for IndexerHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexerHealth::Healthy => write!(f, "HEALTHY"),
            IndexerHealth::Lagging => write!(f, "LAGGING"),
            IndexerHealth::Stalled => write!(f, "STALLED"),
        }
    }
}

impl DiscoveryStatus {
    /// Blocks the indexer is behind the chain head.
    pub fn lag(&self) -> u64 {
        self.latest_block.saturating_sub(self.last_indexed_block)
    }
}

/// Full protocol state for one chain, from `discovery/{chainName}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolState {
    pub chain: String,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub contracts: Vec<ContractEntry>,
}

/// One discovered protocol contract with its current configuration.
/// The configuration shape varies per contract, so it stays a JSON value
/// and is formatted (or decoded further) at the rendering seam.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEntry {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Latest protocol state across all chains, from `discovery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySnapshot {
    #[serde(default)]
    pub chains: Vec<ProtocolState>,
}

impl DiscoverySnapshot {
    pub fn chain(&self, name: &str) -> Option<&ProtocolState> {
        self.chains.iter().find(|c| c.chain == name)
    }
}

/// A tracked application and its per-chain configuration, from
/// `tracking/{chainName}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedApp {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_snapshot_round_trips() {
        let body = r#"{
            "chains": [{
                "chain": "ethereum",
                "blockNumber": 19000000,
                "timestamp": "2026-01-05T12:00:00Z",
                "contracts": [
                    {"name": "endpoint", "address": "0x1a44", "config": {"version": 2}}
                ]
            }]
        }"#;
        let snapshot: DiscoverySnapshot = serde_json::from_str(body).unwrap();
        let eth = snapshot.chain("ethereum").unwrap();
        assert_eq!(eth.block_number, 19_000_000);
        assert_eq!(eth.contracts[0].name, "endpoint");
        assert!(snapshot.chain("base").is_none());
    }

    #[test]
    fn status_lag_saturates() {
        let status = DiscoveryStatus {
            chain: "base".to_string(),
            last_indexed_block: 100,
            latest_block: 90,
            health: IndexerHealth::Healthy,
            updated_at: Utc::now(),
        };
        assert_eq!(status.lag(), 0);
    }

    #[test]
    fn indexer_health_parses_lowercase() {
        let health: IndexerHealth = serde_json::from_str(r#""lagging""#).unwrap();
        assert_eq!(health, IndexerHealth::Lagging);
    }
}
