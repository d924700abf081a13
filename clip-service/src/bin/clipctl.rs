//! Command-line client for the clipboard dispatcher
//!
//! Every subcommand is one dispatcher request; the response is printed as JSON.

use clap::{Parser, Subcommand};
use clip_service::config::Config;
use clip_service::item::{ContentType, ItemPatch, NewItem};
use clip_service::logging::init_logging;
use clip_service::message::Request;
use clip_service::search::ItemFilter;
use clip_service::settings::SettingsPatch;
use clip_service::transport::ServiceClient;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "clipctl")]
#[command(about = "Inspect and edit the clipboard manager store")]
#[command(version)]
struct Cli {
    /// Dispatcher socket (defaults to the configured one)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save text as a new item ("-" reads stdin)
    Add {
        content: String,
        #[arg(long)]
        title: Option<String>,
        /// text, link, image or code; classified when omitted
        #[arg(long = "type")]
        content_type: Option<ContentType>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        board: Option<Uuid>,
        #[arg(long)]
        pin: bool,
    },
    /// Capture like the keyboard command; reads the selection when no text is given
    Quick { text: Option<String> },
    /// List all items, newest first
    List,
    /// Filter items
    Search {
        query: Option<String>,
        #[arg(long = "type")]
        content_type: Option<ContentType>,
        #[arg(long)]
        board: Option<Uuid>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        pinned: bool,
        #[arg(long)]
        favorites: bool,
    },
    /// Ranked completions for a prefix
    Suggest {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Edit an item
    Edit {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Comma-separated tags, replacing the current ones
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        board: Option<Uuid>,
    },
    /// Toggle the pinned flag
    Pin { id: Uuid },
    /// Toggle the favorite flag
    Fav { id: Uuid },
    /// Delete items
    Rm {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Delete every item
    Clear,
    /// List boards
    Boards,
    /// Create a board
    BoardAdd {
        name: String,
        /// #rrggbb
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a board; its items move to the default board
    BoardRm { id: Uuid },
    /// Show settings
    Settings,
    /// Change settings
    Set {
        #[arg(long)]
        auto_sync: Option<bool>,
        #[arg(long)]
        max_items: Option<usize>,
        /// Milliseconds
        #[arg(long)]
        sync_interval: Option<u64>,
        #[arg(long)]
        auto_save: Option<bool>,
    },
}

fn split_tags(tags: Option<String>) -> Option<Vec<String>> {
    tags.map(|tags| tags.split(',').map(|t| t.trim().to_string()).collect())
}

fn read_content(content: String) -> std::io::Result<String> {
    if content != "-" {
        return Ok(content);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn build_request(command: Commands) -> std::io::Result<Request> {
    let request = match command {
        Commands::Add {
            content,
            title,
            content_type,
            tags,
            board,
            pin,
        } => Request::AddClipboardItem {
            item: NewItem {
                content: read_content(content)?,
                title,
                content_type,
                tags: split_tags(tags).unwrap_or_default(),
                is_pinned: pin,
                board_id: board,
                ..NewItem::default()
            },
        },
        Commands::Quick { text } => Request::QuickCopy {
            text,
            source_url: None,
        },
        Commands::List => Request::GetClipboardItems,
        Commands::Search {
            query,
            content_type,
            board,
            tag,
            pinned,
            favorites,
        } => Request::SearchItems {
            filter: ItemFilter {
                query,
                content_type,
                board_id: board,
                tag,
                pinned_only: pinned,
                favorites_only: favorites,
            },
        },
        Commands::Suggest { query, limit } => Request::GetSuggestions { query, limit },
        Commands::Edit {
            id,
            title,
            content,
            tags,
            board,
        } => Request::UpdateClipboardItem {
            id,
            patch: ItemPatch {
                title,
                content,
                tags: split_tags(tags),
                board_id: board,
                ..ItemPatch::default()
            },
        },
        Commands::Pin { id } => Request::TogglePin { id },
        Commands::Fav { id } => Request::ToggleFavorite { id },
        Commands::Rm { ids } => Request::DeleteClipboardItems { ids },
        Commands::Clear => Request::ClearClipboardItems,
        Commands::Boards => Request::GetBoards,
        Commands::BoardAdd { name, color } => Request::CreateBoard { name, color },
        Commands::BoardRm { id } => Request::DeleteBoard { id },
        Commands::Settings => Request::GetSettings,
        Commands::Set {
            auto_sync,
            max_items,
            sync_interval,
            auto_save,
        } => Request::UpdateSettings {
            settings: SettingsPatch {
                auto_sync,
                max_items,
                sync_interval,
                auto_save_clipboard: auto_save,
            },
        },
    };
    Ok(request)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config, origin) = Config::load(None);
    init_logging("warn");
    origin.log();

    let socket = cli.socket.unwrap_or(config.server.socket_path);
    let request = match build_request(cli.command) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Failed to read input: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let response = match ServiceClient::new(socket).send(&request).await {
        Ok(response) => response,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to format response: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
