//! Query-string-backed selection state.
//!
//! The dashboard keeps every piece of selection state (chain, remote
//! chain, changelog filters) in the URL's query string so views survive
//! reloads and links are shareable. `QueryState` is the explicit context
//! object handed to the rendering layer: parse once per request, thread
//! it down, rebuild links from it. Encoded output is always
//! alphabetically sorted so equal selections produce identical URLs.

use std::collections::BTreeMap;
use url::form_urlencoded;

/// Selected chain name.
pub const CHAIN: &str = "chain";
/// Selected remote chain in pathway detail views.
pub const REMOTE_CHAIN: &str = "remote-chain";

/// A value that can live in a query parameter.
///
/// `to_query` returning `None` means "absent" (the parameter is removed
/// from the URL). `from_query` must never panic: anything that does not
/// deserialize is treated as absent.
pub trait QueryValue: Sized {
    fn to_query(&self) -> Option<String>;
    fn from_query(raw: &str) -> Option<Self>;
}

impl QueryValue for String {
    fn to_query(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.clone())
        }
    }

    fn from_query(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        }
    }
}

impl QueryValue for i32 {
    fn to_query(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn from_query(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl QueryValue for chrono::NaiveDate {
    fn to_query(&self) -> Option<String> {
        Some(self.format("%Y-%m-%d").to_string())
    }

    fn from_query(raw: &str) -> Option<Self> {
        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

impl QueryValue for crate::changelog::ChangeCategory {
    fn to_query(&self) -> Option<String> {
        Some(self.name().to_string())
    }

    fn from_query(raw: &str) -> Option<Self> {
        Self::from_name(raw)
    }
}

/// An ordered set of query-string entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    entries: BTreeMap<String, String>,
}

impl QueryState {
    /// Parse a raw query string (without the leading `?`). Malformed
    /// pairs are dropped, never an error.
    pub fn parse(query: &str) -> Self {
        let entries = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { entries }
    }

    pub fn get<V: QueryValue>(&self, key: &str) -> Option<V> {
        self.entries.get(key).and_then(|raw| V::from_query(raw))
    }

    pub fn get_or<V: QueryValue>(&self, key: &str, fallback: V) -> V {
        self.get(key).unwrap_or(fallback)
    }

    /// Set or clear one parameter in place.
    pub fn set<V: QueryValue>(&mut self, key: &str, value: &V) {
        match value.to_query() {
            Some(raw) => {
                self.entries.insert(key.to_string(), raw);
            }
            None => {
                self.entries.remove(key);
            }
        }
    }

    /// Copy with one parameter replaced; used to build links that keep
    /// the rest of the selection intact.
    pub fn with<V: QueryValue>(&self, key: &str, value: &V) -> Self {
        let mut next = self.clone();
        next.set(key, value);
        next
    }

    /// Copy with one parameter removed.
    pub fn without(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.entries.remove(key);
        next
    }

    /// Percent-encoded query string, keys in alphabetical order.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.entries {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    pub fn href(&self, path: &str) -> String {
        let query = self.encode();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }
}
