//! Cross-context message protocol
//!
//! Requests are JSON objects tagged by `action`; responses are flat objects
//! whose fields depend on the action.

use crate::item::{Board, ClipboardItem, ItemPatch, NewItem};
use crate::search::ItemFilter;
use crate::settings::{Settings, SettingsPatch};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const UNKNOWN_ACTION: &str = "Unknown action";

/// Request sent by the page agent, the native host or the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// Save an item; it has no id yet
    AddClipboardItem { item: NewItem },
    GetClipboardItems,
    /// Read the current selection (served by the page agent)
    GetSelectedText,
    /// Write text to the system clipboard (served by the page agent)
    CopyToClipboard { text: String },
    /// Keyboard-command capture; without `text` the selection is read first
    QuickCopy {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_url: Option<String>,
    },
    UpdateClipboardItem { id: Uuid, patch: ItemPatch },
    DeleteClipboardItems { ids: Vec<Uuid> },
    ClearClipboardItems,
    TogglePin { id: Uuid },
    ToggleFavorite { id: Uuid },
    SearchItems {
        #[serde(default)]
        filter: ItemFilter,
    },
    GetSuggestions {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    GetBoards,
    CreateBoard {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    DeleteBoard { id: Uuid },
    GetSettings,
    UpdateSettings { settings: SettingsPatch },
    /// Any action this build does not know
    #[serde(other)]
    Unknown,
}

impl Request {
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

/// Response sent back to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ClipboardItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ClipboardItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<Board>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boards: Option<Vec<Board>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: Some(true),
            ..Self::default()
        }
    }

    pub fn saved(item: ClipboardItem) -> Self {
        Self {
            item: Some(item),
            ..Self::ok()
        }
    }

    pub fn items(items: Vec<ClipboardItem>) -> Self {
        Self {
            items: Some(items),
            ..Self::default()
        }
    }

    pub fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }

    pub fn board(board: Board) -> Self {
        Self {
            board: Some(board),
            ..Self::ok()
        }
    }

    pub fn boards(boards: Vec<Board>) -> Self {
        Self {
            boards: Some(boards),
            ..Self::default()
        }
    }

    pub fn settings(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    pub fn count(count: usize) -> Self {
        Self {
            count: Some(count),
            ..Self::ok()
        }
    }

    /// `{success: false, error}` for a failed operation
    pub fn failure(message: &str) -> Self {
        Self {
            success: Some(false),
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// `{error}` for a request that could not be served at all
    pub fn error(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn unknown_action() -> Self {
        Self::error(UNKNOWN_ACTION)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.success != Some(false)
    }
}
