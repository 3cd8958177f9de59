//! Safe multisig transaction records, decoded for display.
//!
//! Transactions come from the transaction-service proxy already
//! ABI-decoded into a call tree (`dataDecoded`); this module renders that
//! tree as a signature string and parameter summary, and classifies each
//! transaction's status. Same-nonce transactions are mutually exclusive
//! on-chain, so once one executes, the rest of its nonce group is dead.

pub mod decode;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransaction {
    pub safe: String,
    pub nonce: u64,
    #[serde(default)]
    pub is_executed: bool,
    pub submission_date: DateTime<Utc>,
    #[serde(default)]
    pub confirmations: u64,
    #[serde(default)]
    pub confirmations_required: u64,
    /// ABI-decoded call tree, absent when the service could not decode
    /// the transaction data.
    #[serde(default)]
    pub data_decoded: Option<DecodedCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCall {
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<DecodedParam>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: serde_json::Value,
    /// Present on multiSend-style parameters: the batched inner calls.
    #[serde(default)]
    pub value_decoded: Option<Vec<InnerCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InnerCall {
    pub to: String,
    #[serde(default)]
    pub data_decoded: Option<DecodedCall>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeTxStatus {
    Pending,
    Executed,
    Discarded,
}

impl std::fmt::Display for SafeTxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafeTxStatus::Pending => write!(f, "PENDING"),
            SafeTxStatus::Executed => write!(f, "EXECUTED"),
            SafeTxStatus::Discarded => write!(f, "DISCARDED"),
        }
    }
}

/// Classify one transaction against the full queue it was fetched with.
/// A non-executed transaction whose nonce was consumed by another,
/// executed transaction can never execute and is DISCARDED, not PENDING.
pub fn classify(tx: &SafeTransaction, all: &[SafeTransaction]) -> SafeTxStatus {
    if tx.is_executed {
        return SafeTxStatus::Executed;
    }
    if all.iter().any(|other| other.nonce == tx.nonce && other.is_executed) {
        return SafeTxStatus::Discarded;
    }
    SafeTxStatus::Pending
}

/// Human-readable signature for a decoded call, e.g.
/// `setConfig(address,uint32,bytes)`.
pub fn call_signature(call: &DecodedCall) -> String {
    let kinds: Vec<&str> = call.parameters.iter().map(|p| p.kind.as_str()).collect();
    format!("{}({})", call.method, kinds.join(","))
}

/// One `name = value` line per parameter, with long hex values shortened
/// for table cells.
pub fn param_summary(call: &DecodedCall) -> Vec<String> {
    call.parameters
        .iter()
        .map(|param| format!("{} = {}", param.name, format_value(&param.value)))
        .collect()
}

/// Inner calls batched under a multiSend-style parameter, in order.
pub fn nested_calls(call: &DecodedCall) -> Vec<&DecodedCall> {
    call.parameters
        .iter()
        .flat_map(|param| param.value_decoded.iter().flatten())
        .filter_map(|inner| inner.data_decoded.as_ref())
        .collect()
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => shorten_hex(s),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", parts.join(", "))
        }
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn shorten_hex(s: &str) -> String {
    if s.starts_with("0x") && s.len() > 20 {
        format!("{}…{}", &s[..10], &s[s.len() - 6..])
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(nonce: u64, executed: bool) -> SafeTransaction {
        SafeTransaction {
            safe: "0xsafe".to_string(),
            nonce,
            is_executed: executed,
            submission_date: "2026-02-01T00:00:00Z".parse().unwrap(),
            confirmations: 2,
            confirmations_required: 3,
            data_decoded: None,
        }
    }

    #[test]
    fn executed_same_nonce_discards_the_loser() {
        let queue = vec![tx(5, true), tx(5, false)];
        assert_eq!(classify(&queue[0], &queue), SafeTxStatus::Executed);
        assert_eq!(classify(&queue[1], &queue), SafeTxStatus::Discarded);
    }

    #[test]
    fn unconsumed_nonce_stays_pending() {
        let queue = vec![tx(4, true), tx(5, false), tx(6, false)];
        assert_eq!(classify(&queue[1], &queue), SafeTxStatus::Pending);
        assert_eq!(classify(&queue[2], &queue), SafeTxStatus::Pending);
    }

    #[test]
    fn signature_lists_parameter_types() {
        let call: DecodedCall = serde_json::from_value(serde_json::json!({
            "method": "setConfig",
            "parameters": [
                {"name": "_oapp", "type": "address", "value": "0x1a44076050125825900e736c501f859c50fE728c"},
                {"name": "_eid", "type": "uint32", "value": "30101"},
                {"name": "_config", "type": "bytes", "value": "0x0000000000000000000000000000000000000000000000000000000000000f00"}
            ]
        }))
        .unwrap();
        assert_eq!(call_signature(&call), "setConfig(address,uint32,bytes)");

        let summary = param_summary(&call);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[1], "_eid = 30101");
        assert!(summary[0].starts_with("_oapp = 0x1a440760…"));
        assert!(summary[2].contains('…'), "long hex is shortened");
    }

    #[test]
    fn nested_multisend_calls_are_surfaced() {
        let call: DecodedCall = serde_json::from_value(serde_json::json!({
            "method": "multiSend",
            "parameters": [{
                "name": "transactions",
                "type": "bytes",
                "value": "0xdeadbeef",
                "valueDecoded": [
                    {"to": "0xaaa", "dataDecoded": {"method": "setDefaultSendLibrary", "parameters": []}},
                    {"to": "0xbbb", "dataDecoded": {"method": "setDefaultReceiveLibrary", "parameters": []}},
                    {"to": "0xccc"}
                ]
            }]
        }))
        .unwrap();
        let inner = nested_calls(&call);
        assert_eq!(inner.len(), 2, "undecodable inner call skipped");
        assert_eq!(inner[0].method, "setDefaultSendLibrary");
        assert_eq!(inner[1].method, "setDefaultReceiveLibrary");
    }

    #[test]
    fn queue_parses_service_shape() {
        let body = r#"[{
            "safe": "0x9aA1b1c2",
            "nonce": 12,
            "isExecuted": false,
            "submissionDate": "2026-05-01T10:30:00Z",
            "confirmations": 1,
            "confirmationsRequired": 2
        }]"#;
        let queue: Vec<SafeTransaction> = serde_json::from_str(body).unwrap();
        assert_eq!(queue[0].nonce, 12);
        assert!(queue[0].data_decoded.is_none());
    }
}
