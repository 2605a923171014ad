//! Face: the dialogue router process.

use clap::Parser;
use lilith::{Collaborators, LilithConfig, Router, logging};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Lilith Face: routes voice, text and avatar traffic to the Logic Core.
#[derive(Parser)]
#[command(name = "lilith-face", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides network.face_addr).
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Logic Core address (overrides network.core_addr).
    #[arg(long)]
    core: Option<SocketAddr>,

    /// Ears address for mute signals (overrides network.ears_addr).
    #[arg(long)]
    ears: Option<SocketAddr>,

    /// Sandbox root for !read / !write / !run (overrides sandbox.root).
    #[arg(long)]
    sandbox: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = LilithConfig::load_or_default(cli.config.as_deref())?;
    if let Some(addr) = cli.bind {
        config.network.face_addr = addr;
    }
    if let Some(addr) = cli.core {
        config.network.core_addr = addr;
    }
    if let Some(addr) = cli.ears {
        config.network.ears_addr = addr;
    }
    if let Some(root) = cli.sandbox {
        config.sandbox.root = root;
    }
    config.validate()?;

    let _log_guard = logging::init(&config.logging, "lilith-face");
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "face starting");

    let collaborators = Collaborators::from_config(&config);
    let mut router = Router::bind(&config, collaborators).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
        }
        on_signal.cancel();
    });

    router.run(cancel).await?;
    Ok(())
}
