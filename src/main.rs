#![forbid(unsafe_code)]

//! `interplex` — master node binary.
//!
//! Bootstraps configuration and the coordination core (topic store,
//! multiplexer registry, module registry, session manager), then runs
//! until interrupted. Wire transports embed the library and attach node
//! links and peers through its API.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use interplex::config::GlobalConfig;
use interplex::orchestrator::session::SessionContext;
use interplex::orchestrator::session_manager::{spawn_session_event_consumer, SessionManager};
use interplex::runtime::registry::ModuleRegistry;
use interplex::topics::{MuxRegistry, TopicStore};
use interplex::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "interplex", about = "Processing-pipeline master node", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format);
    info!("interplex master node bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = match args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    info!(
        node_id = config.node_id,
        node_name = config.node_name,
        "configuration loaded"
    );

    let topics = Arc::new(TopicStore::new());
    let muxes = Arc::new(MuxRegistry::new(Arc::clone(&topics)));
    let modules = Arc::new(ModuleRegistry::new(config.node_id.clone()));

    let ct = CancellationToken::new();
    let (event_tx, event_rx) = tokio::sync::mpsc::channel(32);
    let event_consumer = spawn_session_event_consumer(event_rx, ct.clone());

    let sessions = Arc::new(SessionManager::new(SessionContext {
        master_node_id: config.node_id.clone(),
        topics,
        muxes,
        modules,
        event_tx,
        remote_start_timeout: config.session.remote_start_timeout(),
    }));
    info!(
        sessions = sessions.session_count(),
        "master node ready; transports attach node links and peers via the library API"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    ct.cancel();
    let _ = event_consumer.await;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => fmt().with_env_filter(filter).init(),
        LogFormat::Json => fmt().with_env_filter(filter).json().init(),
    }
}
