//! Periodically-refreshed backend resources.
//!
//! A `Poller<T>` owns one background task that keeps a single JSON
//! resource fresh: fetch on activation, refetch on a fixed interval,
//! refetch immediately when the resource URL changes. Consumers observe
//! `{data, is_loading, is_error}` through a watch channel.
//!
//! Cancellation rules:
//! - a URL change drops the in-flight request future at the `select!`
//!   boundary, so a superseded response is never committed to state
//! - dropping the `Poller` aborts the task, which cancels the in-flight
//!   request and clears the interval in the same step
//! - a deliberately cancelled request is not an error; only transport
//!   failures, non-success statuses, and schema mismatches set `is_error`
//!
//! A failed refresh keeps the previous `data` (stale data with an error
//! flag beats no data).

use crate::client::{fetch_json, FetchError};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Observable state of one polled resource.
#[derive(Debug, Clone)]
pub struct PollState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub is_error: bool,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_error: false,
        }
    }
}

/// Handle to one polled resource. Exclusively owned by its consumer;
/// dropping it stops all fetching.
pub struct Poller<T> {
    state_rx: watch::Receiver<PollState<T>>,
    url_tx: watch::Sender<Option<String>>,
    task: JoinHandle<()>,
}

impl<T> Poller<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Start polling `url` every `every`. A `None` url means the gate is
    /// closed: no network activity until a url is set.
    pub fn spawn(http: reqwest::Client, url: Option<String>, every: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(PollState::default());
        let (url_tx, url_rx) = watch::channel(url);
        let task = tokio::spawn(run_loop::<T>(http, state_tx, url_rx, every));
        Self {
            state_rx,
            url_tx,
            task,
        }
    }

    /// Latest observed state (cheap clone of the watch value).
    pub fn state(&self) -> PollState<T> {
        self.state_rx.borrow().clone()
    }

    /// Subscribe for change notifications.
    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.state_rx.clone()
    }

    /// Re-parameterize the resource. Setting a different url cancels any
    /// in-flight request and refetches immediately; setting the same url
    /// is a no-op (no duplicate timers or requests). `None` closes the
    /// gate.
    pub fn set_url(&self, url: Option<String>) {
        self.url_tx.send_if_modified(|current| {
            if *current == url {
                false
            } else {
                *current = url;
                true
            }
        });
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_loop<T>(
    http: reqwest::Client,
    state_tx: watch::Sender<PollState<T>>,
    mut url_rx: watch::Receiver<Option<String>>,
    every: Duration,
) where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    loop {
        let url = url_rx.borrow_and_update().clone();
        let Some(url) = url else {
            // Gate closed: no network at all until re-parameterized.
            if url_rx.changed().await.is_err() {
                return;
            }
            continue;
        };

        state_tx.send_modify(|s| s.is_loading = true);

        tokio::select! {
            result = fetch_json::<T>(&http, &url) => {
                apply(&state_tx, &url, result);
            }
            changed = url_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                // In-flight request dropped; its response is never applied.
                debug!(url = %url, "request superseded by new parameters");
                continue;
            }
        }

        // Sit out the interval, but a parameter change restarts right away.
        tokio::select! {
            _ = tokio::time::sleep(every) => {}
            changed = url_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

fn apply<T>(state_tx: &watch::Sender<PollState<T>>, url: &str, result: Result<T, FetchError>) {
    match result {
        Ok(data) => {
            state_tx.send_modify(|s| {
                s.data = Some(data);
                s.is_error = false;
                s.is_loading = false;
            });
        }
        Err(err) => {
            warn!(url = url, error = %err, "poll fetch failed");
            // Keep prior data: stale-while-revalidate.
            state_tx.send_modify(|s| {
                s.is_error = true;
                s.is_loading = false;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_gate_performs_no_fetch() {
        // An unroutable url would error if it were ever fetched.
        let poller: Poller<serde_json::Value> = Poller::spawn(
            reqwest::Client::new(),
            None,
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(80)).await;
        let state = poller.state();
        assert!(state.data.is_none());
        assert!(!state.is_error);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn setting_identical_url_is_a_noop() {
        let poller: Poller<serde_json::Value> = Poller::spawn(
            reqwest::Client::new(),
            None,
            Duration::from_millis(10),
        );
        let mut rx = poller.subscribe();
        rx.borrow_and_update();
        poller.set_url(None);
        assert!(!rx.has_changed().unwrap());
    }
}
