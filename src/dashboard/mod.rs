//! Axum-based monitoring dashboard.
//!
//! Provides:
//!   GET /                 → HTML overview (chains, contract state, indexer health)
//!   GET /changelog        → HTML changelog heatmap for one contract
//!   GET /multisig         → HTML Safe queue for one multisig
//!   GET /api/state        → JSON latest discovery snapshot
//!   GET /api/state/{chain} → JSON fresh per-chain state
//!   GET /api/chains       → JSON chain list
//!   GET /api/status       → JSON indexer status
//!   GET /api/changelog/{chain}/{address} → JSON change events
//!   GET /api/tracking/{chain}            → JSON tracked applications
//!   GET /api/multisig/{chain}/{address}  → JSON Safe transactions
//!
//! Selection state (chain, remote chain, changelog filters) lives in the
//! query string; every rendered link carries the full sorted selection
//! so views are shareable and survive reloads. Each data source fails
//! independently: an erroring poller shows its stale data plus a warning
//! badge while the rest of the page keeps rendering.

use crate::changelog::calendar::{self, Cell, DayMap};
use crate::changelog::{ChangeCategory, ChangeEvent};
use crate::client::schema::{ChainListEntry, DiscoverySnapshot, DiscoveryStatus, ProtocolState};
use crate::client::ScanApiClient;
use crate::multisig::{self, SafeTransaction};
use crate::params::{QueryState, CHAIN, REMOTE_CHAIN};
use crate::poller::{PollState, Poller};
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Shared state for the dashboard routes. Pollers are owned here; the
/// handlers only ever observe their latest snapshots.
#[derive(Clone)]
pub struct DashboardState {
    pub client: ScanApiClient,
    pub discovery: Arc<Poller<DiscoverySnapshot>>,
    pub chains: Arc<Poller<Vec<ChainListEntry>>>,
    pub status: Arc<Poller<Vec<DiscoveryStatus>>>,
    pub default_chain: Option<String>,
}

/// Build the Axum router.
pub fn build_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(overview_html))
        .route("/changelog", get(changelog_html))
        .route("/multisig", get(multisig_html))
        .route("/api/state", get(api_state))
        .route("/api/state/:chain", get(api_chain_state))
        .route("/api/chains", get(api_chains))
        .route("/api/status", get(api_status))
        .route("/api/changelog/:chain/:address", get(api_changelog))
        .route("/api/tracking/:chain", get(api_tracking))
        .route("/api/multisig/:chain/:address", get(api_multisig))
        .with_state(state)
}

/// Start the dashboard server.
pub async fn serve(state: DashboardState, bind_addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = bind_addr, "dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// --- API Handlers ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourcePayload<T> {
    data: Option<T>,
    is_loading: bool,
    is_error: bool,
}

fn payload<T: Serialize>(state: PollState<T>) -> Json<ResourcePayload<T>> {
    Json(ResourcePayload {
        data: state.data,
        is_loading: state.is_loading,
        is_error: state.is_error,
    })
}

async fn api_state(State(state): State<DashboardState>) -> impl IntoResponse {
    payload(state.discovery.state())
}

/// Fresh per-chain state straight from the backend, for consumers that
/// want one chain without waiting on the snapshot poller.
async fn api_chain_state(
    State(state): State<DashboardState>,
    Path(chain): Path<String>,
) -> impl IntoResponse {
    match state.client.discovery_for(&chain).await {
        Ok(chain_state) => Json(chain_state).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

async fn api_chains(State(state): State<DashboardState>) -> impl IntoResponse {
    payload(state.chains.state())
}

async fn api_status(State(state): State<DashboardState>) -> impl IntoResponse {
    payload(state.status.state())
}

async fn api_changelog(
    State(state): State<DashboardState>,
    Path((chain, address)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.client.changelog(&chain, &address).await {
        Ok(events) => Json(events).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

async fn api_tracking(
    State(state): State<DashboardState>,
    Path(chain): Path<String>,
) -> impl IntoResponse {
    match state.client.tracking(&chain).await {
        Ok(apps) => Json(apps).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

async fn api_multisig(
    State(state): State<DashboardState>,
    Path((chain, address)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.client.multisig(&chain, &address).await {
        Ok(queue) => Json(queue).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

// --- HTML helpers ---

fn esc(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const PAGE_STYLE: &str = r#"
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body { font-family: 'SF Mono', 'Fira Code', monospace; background: #0d1117; color: #c9d1d9; padding: 20px; }
  h1 { color: #58a6ff; margin-bottom: 20px; font-size: 1.4em; }
  h2 { color: #8b949e; margin: 20px 0 10px 0; font-size: 1.1em; border-bottom: 1px solid #21262d; padding-bottom: 5px; }
  a { color: #58a6ff; text-decoration: none; }
  .cards { display: flex; gap: 15px; margin-bottom: 20px; flex-wrap: wrap; }
  .card { background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 15px 20px; min-width: 160px; }
  .card .label { color: #8b949e; font-size: 0.75em; text-transform: uppercase; letter-spacing: 1px; }
  .card .value { font-size: 1.5em; font-weight: bold; margin-top: 4px; }
  table { width: 100%; border-collapse: collapse; background: #161b22; border: 1px solid #30363d; border-radius: 8px; overflow: hidden; margin-bottom: 15px; }
  th { background: #21262d; color: #8b949e; text-align: left; padding: 8px 12px; font-size: 0.8em; text-transform: uppercase; letter-spacing: 0.5px; }
  td { padding: 8px 12px; border-top: 1px solid #21262d; font-size: 0.85em; }
  tr:hover { background: #1c2128; }
  .selector a { display: inline-block; padding: 3px 10px; margin-right: 6px; border: 1px solid #30363d; border-radius: 6px; }
  .selector a.active { background: #1f6feb; color: #fff; }
  .badge { display: inline-block; padding: 2px 6px; border-radius: 3px; font-size: 0.7em; font-weight: bold; }
  .badge-ok { background: #238636; color: #fff; }
  .badge-warn { background: #9e6a03; color: #fff; }
  .badge-bad { background: #da3633; color: #fff; }
  .badge-off { background: #30363d; color: #8b949e; }
  .warn { color: #f0883e; font-size: 0.8em; margin-bottom: 10px; }
  .heatmap { border-collapse: separate; border-spacing: 3px; background: none; border: none; width: auto; }
  .heatmap td { padding: 0; border: none; }
  .heatmap .cell { width: 12px; height: 12px; border-radius: 2px; display: block; }
  .heatmap .cell.tier-0 { background: #161b22; }
  .heatmap .cell.tier-1 { background: #0e4429; }
  .heatmap .cell.tier-2 { background: #26a641; }
  .heatmap .cell.tier-3 { background: #39d353; }
  .heatmap .cell.excluded { background: #0d1117; outline: 1px solid #21262d; }
  .auto { color: #484f58; font-size: 0.7em; margin-top: 15px; }
"#;

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="10">
<title>{title} &mdash; omniwatch</title>
<style>{style}</style>
</head>
<body>
<h1>omniwatch &mdash; {title}</h1>
{body}
<div class="auto">Auto-refresh 10s | API: /api/state, /api/chains, /api/status</div>
</body>
</html>"#,
        title = esc(title),
        style = PAGE_STYLE,
        body = body,
    ))
}

fn source_warning(label: &str, is_error: bool) -> String {
    if is_error {
        format!(
            "<div class=\"warn\">&#9888; {} refresh failed &mdash; showing last known data</div>",
            esc(label)
        )
    } else {
        String::new()
    }
}

fn chain_selector(qs: &QueryState, chains: &[ChainListEntry], selected: Option<&str>) -> String {
    let links: String = chains
        .iter()
        .filter(|c| c.visible)
        .map(|c| {
            let class = if Some(c.name.as_str()) == selected {
                " class=\"active\""
            } else {
                ""
            };
            // Chain switches reset the remote-chain selection.
            let href = qs.without(REMOTE_CHAIN).with(CHAIN, &c.name).href("/");
            format!("<a{} href=\"{}\">{}</a>", class, esc(&href), esc(&c.name))
        })
        .collect();
    format!("<div class=\"selector\">{links}</div>")
}

fn health_badge(status: &DiscoveryStatus) -> &'static str {
    use crate::client::schema::IndexerHealth;
    match status.health {
        IndexerHealth::Healthy => "badge-ok",
        IndexerHealth::Lagging => "badge-warn",
        IndexerHealth::Stalled => "badge-bad",
    }
}

// --- Overview ---

async fn overview_html(
    State(state): State<DashboardState>,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let qs = QueryState::parse(query.as_deref().unwrap_or(""));

    let chains = state.chains.state();
    let discovery = state.discovery.state();
    let status = state.status.state();

    let chain_list = chains.data.clone().unwrap_or_default();
    let selected = qs
        .get::<String>(CHAIN)
        .or_else(|| state.default_chain.clone())
        .or_else(|| {
            chain_list
                .iter()
                .find(|c| c.visible)
                .map(|c| c.name.clone())
        });

    let mut body = String::new();
    body.push_str(&source_warning("chain list", chains.is_error));
    body.push_str(&chain_selector(&qs, &chain_list, selected.as_deref()));

    // Indexer health cards
    body.push_str(&source_warning("indexer status", status.is_error));
    body.push_str("<h2>Indexing</h2><div class=\"cards\">");
    for entry in status.data.as_deref().unwrap_or_default() {
        body.push_str(&format!(
            "<div class=\"card\"><div class=\"label\">{}</div>\
             <div class=\"value\"><span class=\"badge {}\">{}</span></div>\
             <div class=\"label\">lag {} blocks</div></div>",
            esc(&entry.chain),
            health_badge(entry),
            entry.health,
            entry.lag(),
        ));
    }
    body.push_str("</div>");

    body.push_str(&source_warning("protocol state", discovery.is_error));
    if let Some(name) = selected.as_deref() {
        let chain_state = discovery.data.as_ref().and_then(|snap| snap.chain(name));
        body.push_str(&contracts_section(&qs, name, chain_state, &chain_list));

        match state.client.tracking(name).await {
            Ok(apps) => {
                body.push_str("<h2>Tracked Applications</h2><table>");
                body.push_str("<tr><th>Name</th><th>Address</th><th>Changelog</th></tr>");
                if apps.is_empty() {
                    body.push_str(
                        "<tr><td colspan=\"3\" style=\"text-align:center;color:#666\">No tracked applications</td></tr>",
                    );
                }
                for app in &apps {
                    let changelog = qs
                        .with("address", &app.address)
                        .href("/changelog");
                    body.push_str(&format!(
                        "<tr><td>{}</td><td>{}</td><td><a href=\"{}\">history</a></td></tr>",
                        esc(&app.name),
                        esc(&app.address),
                        esc(&changelog),
                    ));
                }
                body.push_str("</table>");
            }
            Err(err) => {
                body.push_str(&format!(
                    "<div class=\"warn\">&#9888; tracking unavailable: {}</div>",
                    esc(&err.to_string())
                ));
            }
        }
    } else {
        body.push_str("<h2>Contracts</h2><div class=\"warn\">No chain available yet</div>");
    }

    page("overview", &body)
}

fn contracts_section(
    qs: &QueryState,
    chain: &str,
    chain_state: Option<&ProtocolState>,
    chain_list: &[ChainListEntry],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("<h2>Contracts on {}</h2>", esc(chain)));

    let Some(chain_state) = chain_state else {
        out.push_str("<div class=\"warn\">No discovery data for this chain yet</div>");
        return out;
    };

    out.push_str(&format!(
        "<div class=\"cards\"><div class=\"card\"><div class=\"label\">Block</div>\
         <div class=\"value\">{}</div></div>\
         <div class=\"card\"><div class=\"label\">Updated</div>\
         <div class=\"value\" style=\"font-size:0.9em\">{}</div></div></div>",
        chain_state.block_number,
        chain_state.timestamp.format("%Y-%m-%d %H:%M:%S"),
    ));

    out.push_str("<table><tr><th>Contract</th><th>Address</th><th>Changelog</th></tr>");
    for contract in &chain_state.contracts {
        let changelog = qs.with("address", &contract.address).href("/changelog");
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td><a href=\"{}\">history</a></td></tr>",
            esc(&contract.name),
            esc(&contract.address),
            esc(&changelog),
        ));
    }
    out.push_str("</table>");

    // Pathway detail: config of the selected chain as seen toward a
    // remote chain, when one is selected.
    let remotes: Vec<&ChainListEntry> = chain_list
        .iter()
        .filter(|c| c.visible && c.name != chain)
        .collect();
    if !remotes.is_empty() {
        let selected_remote = qs.get::<String>(REMOTE_CHAIN);
        out.push_str("<h2>Pathway</h2><div class=\"selector\">");
        for remote in &remotes {
            let class = if selected_remote.as_deref() == Some(remote.name.as_str()) {
                " class=\"active\""
            } else {
                ""
            };
            let href = qs.with(REMOTE_CHAIN, &remote.name).href("/");
            out.push_str(&format!(
                "<a{} href=\"{}\">{}</a>",
                class,
                esc(&href),
                esc(&remote.name)
            ));
        }
        out.push_str("</div>");

        if let Some(remote) = selected_remote {
            out.push_str(&pathway_table(chain_state, &remote));
        }
    }

    out
}

fn pathway_table(chain_state: &ProtocolState, remote: &str) -> String {
    let mut rows = String::new();
    for contract in &chain_state.contracts {
        if let Some(config) = contract.config.get(remote) {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                esc(&contract.name),
                esc(&render_config_value(config)),
            ));
        }
    }
    if rows.is_empty() {
        rows = format!(
            "<tr><td colspan=\"2\" style=\"text-align:center;color:#666\">No pathway config toward {}</td></tr>",
            esc(remote)
        );
    }
    format!("<table><tr><th>Contract</th><th>Config</th></tr>{rows}</table>")
}

/// Pathway configs carry ABI-encoded ULN blobs as hex strings; anything
/// else renders as compact JSON.
fn render_config_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) if s.starts_with("0x") => {
            multisig::decode::display_uln_config(s)
        }
        other => other.to_string(),
    }
}

// --- Changelog heatmap ---

async fn changelog_html(
    State(state): State<DashboardState>,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let qs = QueryState::parse(query.as_deref().unwrap_or(""));

    let chain = qs.get::<String>(CHAIN);
    let address = qs.get::<String>("address");
    let (Some(chain), Some(address)) = (chain, address) else {
        return page(
            "changelog",
            "<div class=\"warn\">Select a contract from the <a href=\"/\">overview</a> first</div>",
        );
    };

    let today = Utc::now().date_naive();
    let year = qs.get_or("year", today.year());
    let category = qs.get::<ChangeCategory>("category");

    let events = match state.client.changelog(&chain, &address).await {
        Ok(events) => events,
        Err(err) => {
            let body = format!(
                "<div class=\"warn\">&#9888; changelog unavailable: {}</div>",
                esc(&err.to_string())
            );
            return page("changelog", &body);
        }
    };

    let all_days = calendar::group_by_day(&events);
    let days = calendar::filter_category(&all_days, category);
    let data_start = all_days.keys().next().copied();
    let grid = calendar::year_grid(year, &days, data_start, today);

    let mut body = String::new();
    body.push_str(&format!(
        "<h2>{} on {} &mdash; {} changes recorded</h2>",
        esc(&address),
        esc(&chain),
        events.len(),
    ));

    // Year navigation
    body.push_str("<div class=\"selector\">");
    for y in [year - 1, year, year + 1] {
        let class = if y == year { " class=\"active\"" } else { "" };
        let href = qs.without("day").with("year", &y).href("/changelog");
        body.push_str(&format!("<a{} href=\"{}\">{}</a>", class, esc(&href), y));
    }
    body.push_str("</div>");

    // Category filter: ALL plus each category, derived views only.
    body.push_str("<div class=\"selector\">");
    let all_class = if category.is_none() {
        " class=\"active\""
    } else {
        ""
    };
    let all_href = qs.without("category").without("day").href("/changelog");
    body.push_str(&format!(
        "<a{} href=\"{}\">ALL</a>",
        all_class,
        esc(&all_href)
    ));
    for c in ChangeCategory::ALL {
        let class = if category == Some(c) {
            " class=\"active\""
        } else {
            ""
        };
        let href = qs.without("day").with("category", &c).href("/changelog");
        body.push_str(&format!(
            "<a{} href=\"{}\">{}</a>",
            class,
            esc(&href),
            c.name()
        ));
    }
    body.push_str("</div>");

    body.push_str(&heatmap_table(&qs, &grid));

    if let Some(day) = qs.get::<NaiveDate>("day") {
        body.push_str(&day_detail(day, &days));
    }

    page("changelog", &body)
}

fn heatmap_table(qs: &QueryState, grid: &calendar::YearGrid) -> String {
    let mut out = String::from("<table class=\"heatmap\">");
    for row in 0..7 {
        out.push_str("<tr>");
        for week in &grid.weeks {
            match &week.cells[row] {
                Cell::Filler => out.push_str("<td><span class=\"cell excluded\"></span></td>"),
                Cell::Day(day) => {
                    let tier = calendar::color_tier(day.count).css_class();
                    let class = if day.excluded {
                        format!("cell {tier} excluded")
                    } else {
                        format!("cell {tier}")
                    };
                    let title = format!("{}: {} changes", day.date, day.count);
                    if day.clickable() {
                        let href = qs.with("day", &day.date).href("/changelog");
                        out.push_str(&format!(
                            "<td><a class=\"{}\" title=\"{}\" href=\"{}\"></a></td>",
                            class,
                            esc(&title),
                            esc(&href),
                        ));
                    } else {
                        out.push_str(&format!(
                            "<td><span class=\"{}\" title=\"{}\"></span></td>",
                            class,
                            esc(&title),
                        ));
                    }
                }
            }
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}

fn day_detail(day: NaiveDate, days: &DayMap) -> String {
    let Some(events) = days.get(&day) else {
        return format!("<h2>{day}</h2><div class=\"warn\">No changes on this day</div>");
    };

    let mut out = format!("<h2>{day}</h2>");
    for event in events {
        out.push_str(&event_table(event));
    }
    out
}

fn event_table(event: &ChangeEvent) -> String {
    let tx_hashes = if event.possible_tx_hashes.is_empty() {
        "unknown".to_string()
    } else {
        event
            .possible_tx_hashes
            .iter()
            .map(|h| esc(h))
            .collect::<Vec<_>>()
            .join("<br>")
    };

    let mut rows = String::new();
    for change in &event.changes {
        let previous = change.previous_value.as_deref().unwrap_or("-");
        let current = change.current_value.as_deref().unwrap_or("-");
        // ULN config blobs are decoded inline; a bad blob only affects
        // its own cell.
        let (previous, current) = if change.category == ChangeCategory::UlnConfig {
            (decode_if_hex(previous), decode_if_hex(current))
        } else {
            (esc(previous), esc(current))
        };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            esc(&change.path_display()),
            change.category,
            change.modification_type,
            previous,
            current,
        ));
    }

    format!(
        "<table><tr><th colspan=\"5\">block {} &mdash; {} &mdash; tx: {}</th></tr>\
         <tr><th>Parameter</th><th>Category</th><th>Kind</th><th>Previous</th><th>Current</th></tr>{}</table>",
        event.block_number,
        event.timestamp.format("%H:%M:%S"),
        tx_hashes,
        rows,
    )
}

fn decode_if_hex(value: &str) -> String {
    if value.starts_with("0x") && value.len() > 66 {
        esc(&multisig::decode::display_uln_config(value))
    } else {
        esc(value)
    }
}

// --- Multisig queue ---

async fn multisig_html(
    State(state): State<DashboardState>,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let qs = QueryState::parse(query.as_deref().unwrap_or(""));

    let chain = qs.get::<String>(CHAIN);
    let safe = qs.get::<String>("safe");
    let (Some(chain), Some(safe)) = (chain, safe) else {
        return page(
            "multisig",
            "<div class=\"warn\">Pass ?chain=&lt;name&gt;&amp;safe=&lt;address&gt; to inspect a Safe queue</div>",
        );
    };

    let queue = match state.client.multisig(&chain, &safe).await {
        Ok(queue) => queue,
        Err(err) => {
            let body = format!(
                "<div class=\"warn\">&#9888; multisig queue unavailable: {}</div>",
                esc(&err.to_string())
            );
            return page("multisig", &body);
        }
    };

    let mut body = format!(
        "<h2>Safe {} on {} &mdash; {} transactions</h2>",
        esc(&safe),
        esc(&chain),
        queue.len(),
    );
    body.push_str(
        "<table><tr><th>Nonce</th><th>Status</th><th>Submitted</th>\
         <th>Confirmations</th><th>Call</th><th>Parameters</th></tr>",
    );
    for tx in &queue {
        body.push_str(&multisig_row(tx, &queue));
    }
    if queue.is_empty() {
        body.push_str(
            "<tr><td colspan=\"6\" style=\"text-align:center;color:#666\">No transactions</td></tr>",
        );
    }
    body.push_str("</table>");

    page("multisig", &body)
}

fn multisig_row(tx: &SafeTransaction, queue: &[SafeTransaction]) -> String {
    let status = multisig::classify(tx, queue);
    let badge = match status {
        multisig::SafeTxStatus::Executed => "badge-ok",
        multisig::SafeTxStatus::Pending => "badge-warn",
        multisig::SafeTxStatus::Discarded => "badge-off",
    };

    let (call, params) = match &tx.data_decoded {
        Some(decoded) => {
            let mut lines: Vec<String> = multisig::param_summary(decoded)
                .iter()
                .map(|line| esc(line))
                .collect();
            for inner in multisig::nested_calls(decoded) {
                lines.push(format!("&rarr; {}", esc(&multisig::call_signature(inner))));
            }
            (multisig::call_signature(decoded), lines.join("<br>"))
        }
        None => (
            multisig::decode::DECODE_PLACEHOLDER.to_string(),
            "-".to_string(),
        ),
    };

    format!(
        "<tr><td>{}</td><td><span class=\"badge {}\">{}</span></td><td>{}</td>\
         <td>{}/{}</td><td>{}</td><td>{}</td></tr>",
        tx.nonce,
        badge,
        status,
        tx.submission_date.format("%Y-%m-%d %H:%M"),
        tx.confirmations,
        tx.confirmations_required,
        esc(&call),
        params,
    )
}
