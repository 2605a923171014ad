//! Logic Core: the language-model server behind the Face.

use clap::Parser;
use lilith::logic_core::LogicCore;
use lilith::logic_core::backend::OpenAiBackend;
use lilith::{LilithConfig, logging};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Lilith Logic Core: answers Face requests through an OpenAI-compatible
/// model server, reviews changed source files and reacts to editor log
/// errors.
#[derive(Parser)]
#[command(name = "lilith-core", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides network.core_addr).
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Face address receiving code watcher events (overrides network.face_addr).
    #[arg(long)]
    face: Option<SocketAddr>,

    /// Model server base URL (overrides core.api_url).
    #[arg(long)]
    api_url: Option<String>,

    /// Model name (overrides core.model).
    #[arg(long)]
    model: Option<String>,

    /// Directory of source files to review on change (overrides core.watch_dir).
    #[arg(long)]
    watch: Option<PathBuf>,

    /// Editor log to tail for new errors (overrides core.watch_log).
    #[arg(long)]
    watch_log: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = LilithConfig::load_or_default(cli.config.as_deref())?;
    if let Some(addr) = cli.bind {
        config.network.core_addr = addr;
    }
    if let Some(addr) = cli.face {
        config.network.face_addr = addr;
    }
    if let Some(url) = cli.api_url {
        config.core.api_url = url;
    }
    if let Some(model) = cli.model {
        config.core.model = model;
    }
    if cli.watch.is_some() {
        config.core.watch_dir = cli.watch;
    }
    if cli.watch_log.is_some() {
        config.core.watch_log = cli.watch_log;
    }
    config.validate()?;

    let _log_guard = logging::init(&config.logging, "lilith-core");

    let backend = OpenAiBackend::new(&config.core)?;
    tracing::info!(endpoint = backend.endpoint(), model = %config.core.model, "model backend");
    let mut core = LogicCore::bind(&config, Box::new(backend)).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
        }
        on_signal.cancel();
    });

    core.run(cancel).await?;
    Ok(())
}
