//! Clipboard dispatcher binary
//!
//! Owns the item store and serves the dispatcher protocol on a Unix socket.

use clap::Parser;
use clip_service::config::Config;
use clip_service::logging::init_logging;
use clip_service::transport::cleanup_socket;
use clip_service::ClipServer;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "clip-server", about = "Clipboard manager dispatcher")]
struct Args {
    /// Configuration file (defaults to the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Socket to listen on
    #[arg(long)]
    socket: Option<PathBuf>,

    /// SQLite database path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Page agent socket used for quick copy
    #[arg(long)]
    agent_socket: Option<PathBuf>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(Config::default_config_path);
    let (mut config, origin) = Config::load(Some(config_path.clone()));
    if let Some(socket) = args.socket {
        config.server.socket_path = socket;
    }
    if let Some(db) = args.db {
        config.server.db_path = db;
    }
    if let Some(agent_socket) = args.agent_socket {
        config.server.agent_socket_path = Some(agent_socket);
    }

    init_logging(&config.general.log_level);
    origin.log();

    if args.write_config {
        config.save_to_path(&config_path)?;
        return Ok(());
    }

    info!("Starting clipboard dispatcher");
    info!("Database: {:?}", config.server.db_path);

    let server = ClipServer::new(config.server.clone())?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    cleanup_socket(server.socket_path());
    Ok(())
}
