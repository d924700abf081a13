//! Page agent binary
//!
//! Serves selection and clipboard requests for the dispatcher and polls the
//! system clipboard for auto-save. Shortcut presses are read from stdin, one
//! chord per line (e.g. `Ctrl+Shift+C`), so a hotkey daemon can drive captures.

use clap::Parser;
use clip_service::agent::{Chord, PageAgent, SystemClipboard};
use clip_service::config::Config;
use clip_service::logging::init_logging;
use clip_service::transport::{self, cleanup_socket, ServiceClient};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "clip-agent", about = "Clipboard manager page agent")]
struct Args {
    /// Configuration file (defaults to the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dispatcher socket to send captures to
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Socket to serve agent requests on
    #[arg(long)]
    agent_socket: Option<PathBuf>,

    /// Do not poll the system clipboard
    #[arg(long)]
    no_poll: bool,

    /// Read shortcut presses from stdin
    #[arg(long)]
    stdin_keys: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (mut config, origin) = Config::load(args.config);
    if let Some(socket) = args.socket {
        config.server.socket_path = socket;
    }
    if let Some(agent_socket) = args.agent_socket {
        config.server.agent_socket_path = Some(agent_socket);
    }

    init_logging(&config.general.log_level);
    origin.log();

    let chord: Chord = config.agent.chord.parse()?;
    let clipboard = Arc::new(SystemClipboard::new());
    let agent = Arc::new(
        PageAgent::new(
            ServiceClient::new(&config.server.socket_path),
            clipboard.clone(),
            clipboard,
        )
        .with_chord(chord)
        .with_source_url(config.agent.source_url.clone()),
    );
    info!("Page agent started, capture shortcut {}", agent.chord());

    let listener = match &config.server.agent_socket_path {
        Some(path) => Some(transport::bind(path)?),
        None => {
            warn!("No agent socket configured, quick copy will be unavailable");
            None
        }
    };
    let server = listener.map(|listener| tokio::spawn(transport::serve(listener, Arc::clone(&agent))));

    let poller = if config.agent.poll_clipboard && !args.no_poll {
        let agent = Arc::clone(&agent);
        let interval = Duration::from_millis(config.agent.poll_interval_ms.max(100));
        Some(tokio::spawn(async move { agent.run_poller(interval).await }))
    } else {
        None
    };

    let keys = if args.stdin_keys {
        let agent = Arc::clone(&agent);
        Some(tokio::spawn(async move { read_key_presses(&agent).await }))
    } else {
        None
    };

    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down...");

    for task in [
        server.map(|t| t.abort_handle()),
        poller.map(|t| t.abort_handle()),
        keys.map(|t| t.abort_handle()),
    ]
    .into_iter()
    .flatten()
    {
        task.abort();
    }
    if let Some(path) = &config.server.agent_socket_path {
        cleanup_socket(path);
    }
    Ok(())
}

async fn read_key_presses(agent: &PageAgent) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read key presses: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let press = match line.parse::<Chord>() {
            Ok(chord) => chord.press(),
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };
        match agent.on_key(&press).await {
            Ok(Some(item)) => debug!("Captured selection as item {}", item.id),
            Ok(None) => {}
            Err(e) => warn!("Capture failed: {}", e),
        }
    }
}
