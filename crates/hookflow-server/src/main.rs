mod app;
mod error;
mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hookflow_core::HookflowConfig;
use hookflow_eval::{BlockRegistry, BlockSettings, Executor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::AppState;
use store::{CachedFlowStore, DirectoryFlowStore};

#[derive(Parser)]
#[command(name = "hookflow-server")]
#[command(author, version, about = "Serve hookflow flows over HTTP")]
struct Cli {
    #[arg(long, help = "Path to Hookflow.toml (default: nearest ancestor)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Host to bind to")]
    host: Option<String>,

    #[arg(short, long, help = "Port to listen on")]
    port: Option<u16>,

    #[arg(long, help = "Directory holding <tenant>/<slug>.json flows")]
    flows_dir: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        "hookflow_server=trace,hookflow_eval=debug,tower_http=debug"
    } else {
        "hookflow_server=info,warn"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = HookflowConfig::discover(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = cli.flows_dir {
        config.flows.dir = dir;
    }

    let settings = BlockSettings::from_config(&config)?;
    let registry = BlockRegistry::standard(&settings);
    tracing::debug!(blocks = ?registry.kinds(), "block catalogue ready");

    let flows = CachedFlowStore::new(
        DirectoryFlowStore::new(&config.flows.dir),
        Duration::from_secs(config.flows.cache_ttl_secs),
    );

    let state = Arc::new(AppState {
        executor: Executor::new(Arc::new(registry)),
        flows: Arc::new(flows),
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
    });

    let app = app::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        flows = %config.flows.dir.display(),
        "hookflow listening on http://{}",
        addr
    );
    axum::serve(listener, app).await?;

    Ok(())
}
