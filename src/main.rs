use omniwatch::client::schema::{ChainListEntry, DiscoverySnapshot, DiscoveryStatus, IndexerHealth};
use omniwatch::client::ScanApiClient;
use omniwatch::config::Config;
use omniwatch::dashboard::{self, DashboardState};
use omniwatch::poller::Poller;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Load config
    let config = if Path::new("omniwatch.toml").exists() {
        Config::load(Path::new("omniwatch.toml"))?
    } else {
        Config::from_env()
    };

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    info!("omniwatch v{} starting", env!("CARGO_PKG_VERSION"));
    info!(api = %config.api.base_url, "backend scan API");

    let client = ScanApiClient::new(config.api.base_url.clone(), config.api.request_timeout())?;

    // --- Standing pollers ---
    // One per dashboard-wide data source; contract-level resources
    // (changelog, tracking, multisig queues) are fetched on demand.
    let every = config.api.refresh_interval();
    let discovery = Arc::new(Poller::<DiscoverySnapshot>::spawn(
        client.http().clone(),
        Some(client.discovery_url()),
        every,
    ));
    let chains = Arc::new(Poller::<Vec<ChainListEntry>>::spawn(
        client.http().clone(),
        Some(client.chains_url()),
        every,
    ));
    let status = Arc::new(Poller::<Vec<DiscoveryStatus>>::spawn(
        client.http().clone(),
        Some(client.status_url()),
        every,
    ));

    // --- Periodic health summary ---
    let status_poller = status.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let snapshot = status_poller.state();
            let entries = snapshot.data.as_deref().unwrap_or_default();
            let healthy = entries
                .iter()
                .filter(|s| s.health == IndexerHealth::Healthy)
                .count();
            let stalled = entries
                .iter()
                .filter(|s| s.health == IndexerHealth::Stalled)
                .count();
            info!(
                chains = entries.len(),
                healthy = healthy,
                stalled = stalled,
                stale = snapshot.is_error,
                "indexer health summary"
            );
        }
    });

    // --- Dashboard ---
    let dash_state = DashboardState {
        client,
        discovery,
        chains,
        status,
        default_chain: config.dashboard.default_chain.clone(),
    };

    tokio::select! {
        result = dashboard::serve(dash_state, &config.dashboard.bind_addr) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
