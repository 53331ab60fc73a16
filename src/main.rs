//! deej-web - standalone host for the slider configuration UI
//!
//! Loads the deej config file, serves the web UI and keeps the slider
//! mapping in sync with edits made on disk.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use deej_web::config::{ConfigStore, ConfigWatcher};
use deej_web::sessions::SessionMap;
use deej_web::{WebServer, DEFAULT_SERVER_PORT};

/// deej web configurator - edit slider mappings from the browser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Web UI port
    #[arg(short, long, env = "DEEJ_WEB_PORT", default_value_t = DEFAULT_SERVER_PORT)]
    port: u16,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write daily-rotated logs to this directory
    #[arg(long, env = "DEEJ_WEB_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Emit JSON log lines instead of plain text
    #[arg(long)]
    json_logs: bool,

    /// Print a banner with the web UI URL once serving
    #[arg(long)]
    open: bool,

    /// Session key to report as live (repeatable)
    #[arg(long = "session", value_name = "KEY")]
    sessions: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&args)?;

    info!("Starting deej-web...");
    info!("Configuration file: {}", args.config.display());

    let store = Arc::new(
        ConfigStore::open(&args.config)
            .await
            .context("Failed to load configuration")?,
    );

    let mut watcher = ConfigWatcher::new(store.path())?;
    info!("Configuration loaded successfully with hot-reload enabled");

    let sessions: SessionMap = args.sessions.iter().cloned().collect();
    info!("Reporting {} session(s)", sessions.len());

    let server = WebServer::new(store.clone(), Arc::new(sessions)).with_port(args.port);
    server.start().await?;
    if args.open {
        println!();
        println!("  deej web configurator: {}", server.url());
        println!();
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(mapping) = watcher.next_mapping() => {
                info!("📝 Configuration file changed, applying {} slider mapping(s)", mapping.len());
                store.apply(mapping);
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    info!("Shutting down...");
    if let Err(e) = server.stop().await {
        warn!("Web server did not stop cleanly: {}", e);
    }
    info!("deej-web shutdown complete");
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&args.log_level))
        .with_context(|| format!("Invalid log level: {}", args.log_level))?;

    let console = if args.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    let (file, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "deej-web.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
