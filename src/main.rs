//! fetch-tracker demo
//!
//! Runs one request against the in-process simulated host and prints the
//! outcome.
//!
//! ```text
//!   caller ──execute──▶ RequestTracker ──start──▶ SimulatedHost
//!     ▲                   │   ▲                       │
//!     │                   │   └──notify_request_complete (callback)
//!     │                   ▼                           │
//!     └───── result ── poll loop ◀── status queries ──┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::{json, Value};

use fetch_tracker::config::{load_config, TrackerConfig};
use fetch_tracker::host::{SimulatedHost, Step};
use fetch_tracker::observability::logging::init_logging;
use fetch_tracker::request::proxy_url;
use fetch_tracker::RequestTracker;

#[derive(Parser)]
#[command(name = "fetch-tracker")]
#[command(about = "Track a simulated long-running proxied request", long_about = None)]
struct Cli {
    /// Logical URL of the request.
    #[arg(default_value = "https://api.megaport.com/v2/locations")]
    url: String,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content length reported with the response headers.
    #[arg(long, default_value_t = 2_048)]
    content_length: u64,

    /// Delay between simulated status changes, in milliseconds.
    #[arg(long, default_value_t = 400)]
    step_ms: u64,

    /// Number of partial results before completion.
    #[arg(long, default_value_t = 1)]
    partials: usize,

    /// Fail the request with this message instead of completing it.
    #[arg(long)]
    fail: Option<String>,

    /// Never call back; completion is only visible by polling.
    #[arg(long)]
    silent: bool,

    /// Use the fixed-budget fetch wait instead of the status poller.
    #[arg(long)]
    simple: bool,

    /// Bearer token forwarded to the host.
    #[arg(long, default_value = "demo-token")]
    token: String,
}

fn script(cli: &Cli) -> Vec<Step> {
    let pause = Step::Wait(Duration::from_millis(cli.step_ms));
    let mut steps = vec![
        pause.clone(),
        Step::Headers {
            status: 200,
            content_length: Some(cli.content_length),
        },
        pause.clone(),
        Step::Processing,
    ];
    for index in 0..cli.partials {
        steps.push(pause.clone());
        steps.push(Step::Partial(json!({ "chunk": index })));
    }
    steps.push(pause);
    steps.push(match &cli.fail {
        Some(message) => Step::Fail(message.clone()),
        None => Step::Complete(json!({
            "message": "Demo response",
            "data": [{ "id": 1, "name": "Sydney" }, { "id": 2, "name": "Melbourne" }],
        })),
    });
    steps
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TrackerConfig::default(),
    };
    init_logging(&config.observability);

    tracing::info!(
        url = %cli.url,
        initial_wait_secs = config.budget.initial_wait_secs,
        proxy = config.proxy.enabled,
        "fetch-tracker v0.1.0 starting"
    );

    let mut sim = SimulatedHost::new();
    if cli.silent {
        sim = sim.silent();
    }
    let host_url = if config.proxy.enabled {
        proxy_url(&cli.url, &config.proxy.path_prefix)
    } else {
        cli.url.clone()
    };
    sim.plan(host_url, script(&cli));

    let tracker = RequestTracker::new(Arc::new(sim.clone()), config);
    sim.set_notifier(tracker.notifier());

    let options = json!({ "method": "GET" });
    let outcome = if cli.simple {
        tracker.fetch(&cli.url, &cli.token, &options).await
    } else {
        tracker.execute(&cli.url, &cli.token, &options).await
    };

    tracing::info!(
        notifications = sim.notifications(),
        forced_checks = sim.forced_checks(),
        still_registered = tracker.registry().len(),
        "Request finished"
    );

    let result: Value = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
