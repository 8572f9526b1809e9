use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mds_core::fetch::YtDlpEngine;
use mds_core::job::JobStore;
use mds_core::runner::RunnerSettings;
use mds_core::{config, logging};

mod api;

use api::AppState;

/// MDS: asynchronous media download server.
#[derive(Debug, Parser)]
#[command(name = "mds")]
#[command(about = "MDS: fetch remote media asynchronously and serve it over HTTP", long_about = None)]
struct Cli {
    /// Port to listen on (overrides config and MDS_PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Directory finished artifacts are written to (overrides config and MDS_DOWNLOAD_DIR).
    #[arg(long, value_name = "DIR")]
    download_dir: Option<std::path::PathBuf>,

    /// Path of the yt-dlp binary.
    #[arg(long, default_value = "yt-dlp")]
    engine: String,
}

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; stderr if the state dir is unusable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("mds error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = config::load_or_init().context("load config")?;
    cfg.apply_env();
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    if let Some(dir) = cli.download_dir {
        cfg.download_dir = Some(dir);
    }

    let download_dir = cfg.download_dir();
    tokio::fs::create_dir_all(&download_dir)
        .await
        .with_context(|| format!("create download dir {}", download_dir.display()))?;

    let state = AppState {
        store: Arc::new(JobStore::new()),
        engine: Arc::new(YtDlpEngine::new(cli.engine)),
        settings: Arc::new(RunnerSettings {
            download_dir: download_dir.clone(),
            retry: cfg.retry_policy(),
        }),
    };

    let app = api::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, dir = %download_dir.display(), "mds listening");

    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
