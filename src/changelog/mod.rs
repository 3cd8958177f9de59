//! Contract configuration changelog model.
//!
//! The backend records one `ChangeEvent` per observed configuration
//! change, with field-level diffs. Events arrive from
//! `changelog/{chainName}/{address}` and feed the calendar aggregation
//! in [`calendar`].

pub mod calendar;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded configuration change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub timestamp: DateTime<Utc>,
    pub block_number: u64,
    /// Transaction hashes that may have caused this change. Empty when
    /// unknown, multiple entries when the indexer could not disambiguate.
    #[serde(default)]
    pub possible_tx_hashes: Vec<String>,
    /// Non-empty for any recorded event.
    pub changes: Vec<FieldChange>,
}

/// A single field's diff within a [`ChangeEvent`]. For a created field
/// only `current_value` is set; for a deleted field only `previous_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub parameter_path: Vec<String>,
    pub category: ChangeCategory,
    pub modification_type: ModificationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
}

impl FieldChange {
    pub fn path_display(&self) -> String {
        self.parameter_path.join(".")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeCategory {
    DefaultLibrary,
    UlnConfig,
    ExecutorConfig,
    DvnSet,
    Other,
}

impl ChangeCategory {
    /// Every category, in selector display order.
    pub const ALL: [ChangeCategory; 5] = [
        ChangeCategory::DefaultLibrary,
        ChangeCategory::UlnConfig,
        ChangeCategory::ExecutorConfig,
        ChangeCategory::DvnSet,
        ChangeCategory::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChangeCategory::DefaultLibrary => "DEFAULT_LIBRARY",
            ChangeCategory::UlnConfig => "ULN_CONFIG",
            ChangeCategory::ExecutorConfig => "EXECUTOR_CONFIG",
            ChangeCategory::DvnSet => "DVN_SET",
            ChangeCategory::Other => "OTHER",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModificationType {
    Added,
    Removed,
    Changed,
}

impl std::fmt::Display for ModificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModificationType::Added => write!(f, "ADDED"),
            ModificationType::Removed => write!(f, "REMOVED"),
            ModificationType::Changed => write!(f, "CHANGED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_event_parses_backend_shape() {
        let body = r#"{
            "timestamp": "2026-03-14T09:26:53Z",
            "blockNumber": 21873004,
            "possibleTxHashes": ["0xaaa", "0xbbb"],
            "changes": [{
                "parameterPath": ["uln", "requiredDVNs"],
                "category": "DVN_SET",
                "modificationType": "CHANGED",
                "previousValue": "0x01",
                "currentValue": "0x02"
            }]
        }"#;
        let event: ChangeEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.block_number, 21_873_004);
        assert_eq!(event.possible_tx_hashes.len(), 2);
        assert_eq!(event.changes[0].category, ChangeCategory::DvnSet);
        assert_eq!(event.changes[0].path_display(), "uln.requiredDVNs");
    }

    #[test]
    fn created_field_omits_previous_value() {
        let body = r#"{
            "timestamp": "2026-03-14T09:26:53Z",
            "blockNumber": 1,
            "changes": [{
                "parameterPath": ["executor"],
                "category": "EXECUTOR_CONFIG",
                "modificationType": "ADDED",
                "currentValue": "0x02"
            }]
        }"#;
        let event: ChangeEvent = serde_json::from_str(body).unwrap();
        assert!(event.changes[0].previous_value.is_none());
        assert_eq!(event.changes[0].current_value.as_deref(), Some("0x02"));
    }

    #[test]
    fn category_names_round_trip() {
        for category in ChangeCategory::ALL {
            assert_eq!(ChangeCategory::from_name(category.name()), Some(category));
        }
        assert_eq!(ChangeCategory::from_name("NOT_A_CATEGORY"), None);
    }
}
