//! Terminal uplink: type to the Face, read its replies.

use clap::Parser;
use lilith::protocol::AUDIO_PREFIX;
use lilith::{LilithConfig, Transport};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;

/// How long to wait for the text reply (speech synthesis can be slow).
const REPLY_WINDOW: Duration = Duration::from_secs(15);
/// Grace period for follow-up packets such as the audio signal.
const FOLLOW_UP_WINDOW: Duration = Duration::from_millis(1500);

/// Lilith terminal uplink.
#[derive(Parser)]
#[command(name = "lilith-chat", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Face address (overrides network.face_addr).
    #[arg(long)]
    face: Option<SocketAddr>,

    /// Local address to send from.
    #[arg(long, default_value = "127.0.0.1:0")]
    bind: SocketAddr,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = LilithConfig::load_or_default(cli.config.as_deref())?;
    let face = cli.face.unwrap_or(config.network.face_addr);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let transport = Transport::bind(cli.bind, REPLY_WINDOW).await?;

    println!("==========================================");
    println!("       SYNZ TERMINAL UPLINK ACTIVE        ");
    println!("==========================================");
    println!("commands: !good (Reinforce), !bad (Discard)");
    println!("Ctrl+C to exit.");
    println!("------------------------------------------");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt();
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Err(e) = transport.send_text(input, face).await {
            println!("[ERROR] {e}");
            continue;
        }
        show_replies(&transport, face).await;
    }

    println!("\n[SYSTEM] Uplink closed. Bye.");
    Ok(())
}

fn print_prompt() {
    use std::io::Write;
    print!("\n[YOU]: ");
    let _ = std::io::stdout().flush();
}

/// Print the reply and anything that follows it closely.
async fn show_replies(transport: &Transport, face: SocketAddr) {
    let mut deadline = Instant::now() + REPLY_WINDOW;
    let mut got_reply = false;
    loop {
        match transport.recv_until(deadline).await {
            Ok(Some((text, from))) if from == face => {
                if let Some(path) = text.strip_prefix(AUDIO_PREFIX) {
                    println!("       (audio: {})", path.trim());
                } else {
                    println!("[SYNZ]: {text}");
                }
                got_reply = true;
                deadline = Instant::now() + FOLLOW_UP_WINDOW;
            }
            Ok(Some(_)) => {}
            Ok(None) if Instant::now() >= deadline => break,
            Ok(None) => {}
            Err(e) => {
                println!("[ERROR] {e}");
                println!("[HINT] Is lilith-face running?");
                tokio::time::sleep(Duration::from_secs(1)).await;
                return;
            }
        }
    }
    if !got_reply {
        println!("[SYSTEM] No response. (Is the server generating audio? Wait...)");
    }
}
