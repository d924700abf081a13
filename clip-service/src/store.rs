//! Bounded, most-recent-first item store owned by a single task
//!
//! `ItemStore` holds the storage connection and implements every operation
//! synchronously. `spawn` moves it into a tokio task and hands out cloneable
//! `StoreHandle`s; each call is queued as one job, so read-modify-write cycles
//! from concurrent connections never interleave.

use crate::capture::{build_item, ensure_capturable, normalize_tags, CaptureError};
use crate::item::{Board, ClipboardItem, ItemPatch, NewItem, DEFAULT_BOARD_COLOR};
use crate::search::{filter_items, rank_suggestions, ItemFilter};
use crate::settings::{Settings, SettingsError, SettingsPatch};
use crate::storage::{Storage, StorageError};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Queue depth of the store task
const STORE_QUEUE_CAPACITY: usize = 64;

lazy_static! {
    static ref BOARD_COLOR_RE: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex");
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),
    #[error("Board not found: {0}")]
    BoardNotFound(Uuid),
    #[error("The default board cannot be deleted")]
    DefaultBoard,
    #[error("Invalid board: {0}")]
    InvalidBoard(String),
    #[error("Store task has shut down")]
    Closed,
}

/// Synchronous store logic over a `Storage`
pub struct ItemStore {
    storage: Storage,
}

impl ItemStore {
    /// Wrap `storage`, creating the default board on first open
    pub fn new(storage: Storage) -> Result<Self, StoreError> {
        let store = Self { storage };
        store.ensure_default_board()?;
        Ok(store)
    }

    fn ensure_default_board(&self) -> Result<Board, StoreError> {
        let mut boards = self.storage.load_boards()?;
        if let Some(board) = boards.iter().find(|b| b.is_default) {
            return Ok(board.clone());
        }

        let board = Board::default_board();
        info!("Creating default board {}", board.id);
        boards.insert(0, board.clone());
        self.storage.save_boards(&boards)?;
        Ok(board)
    }

    /// Capture a new item at the front, evicting the oldest beyond `maxItems`
    pub fn insert(&mut self, new: NewItem) -> Result<ClipboardItem, StoreError> {
        let boards = self.storage.load_boards()?;
        if let Some(board_id) = new.board_id {
            if !boards.iter().any(|b| b.id == board_id) {
                return Err(StoreError::BoardNotFound(board_id));
            }
        }
        let default_board = boards.iter().find(|b| b.is_default).map(|b| b.id);

        let item = build_item(new, default_board)?;
        let settings = self.storage.load_settings()?;
        let mut items = self.storage.load_items()?;

        items.insert(0, item.clone());
        let evicted = evict_overflow(&mut items, settings.max_items);
        if evicted > 0 {
            debug!("Evicted {} oldest item(s), cap is {}", evicted, settings.max_items);
        }

        self.storage.save_items(&items)?;
        info!("Saved {} item {} ({})", item.content_type, item.id, item.title);
        Ok(item)
    }

    /// Snapshot of all items, most recent first
    pub fn list(&self) -> Result<Vec<ClipboardItem>, StoreError> {
        Ok(self.storage.load_items()?)
    }

    pub fn get(&self, id: Uuid) -> Result<ClipboardItem, StoreError> {
        self.storage
            .load_items()?
            .into_iter()
            .find(|item| item.id == id)
            .ok_or(StoreError::ItemNotFound(id))
    }

    /// Apply `patch` to one item. The content type is never recomputed.
    pub fn update(&mut self, id: Uuid, patch: ItemPatch) -> Result<ClipboardItem, StoreError> {
        if let Some(content) = &patch.content {
            ensure_capturable(content)?;
        }
        if let Some(board_id) = patch.board_id {
            if !self.storage.load_boards()?.iter().any(|b| b.id == board_id) {
                return Err(StoreError::BoardNotFound(board_id));
            }
        }

        self.modify(id, |item| {
            if let Some(title) = patch.title {
                let title = title.trim();
                if !title.is_empty() {
                    item.title = title.to_string();
                }
            }
            if let Some(content) = patch.content {
                item.content = content;
            }
            if let Some(tags) = patch.tags {
                item.tags = normalize_tags(tags);
            }
            if let Some(pinned) = patch.is_pinned {
                item.is_pinned = pinned;
            }
            if let Some(favorite) = patch.is_favorite {
                item.is_favorite = favorite;
            }
            if let Some(board_id) = patch.board_id {
                item.board_id = Some(board_id);
            }
        })
    }

    pub fn toggle_pin(&mut self, id: Uuid) -> Result<ClipboardItem, StoreError> {
        self.modify(id, |item| item.is_pinned = !item.is_pinned)
    }

    pub fn toggle_favorite(&mut self, id: Uuid) -> Result<ClipboardItem, StoreError> {
        self.modify(id, |item| item.is_favorite = !item.is_favorite)
    }

    fn modify<F>(&mut self, id: Uuid, change: F) -> Result<ClipboardItem, StoreError>
    where
        F: FnOnce(&mut ClipboardItem),
    {
        let mut items = self.storage.load_items()?;
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(StoreError::ItemNotFound(id))?;
        change(item);
        let updated = item.clone();
        self.storage.save_items(&items)?;
        Ok(updated)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
        match self.delete_many(&[id])? {
            0 => Err(StoreError::ItemNotFound(id)),
            _ => Ok(()),
        }
    }

    /// Delete every listed item; unknown ids are ignored. Returns the count removed.
    pub fn delete_many(&mut self, ids: &[Uuid]) -> Result<usize, StoreError> {
        let mut items = self.storage.load_items()?;
        let before = items.len();
        items.retain(|item| !ids.contains(&item.id));
        let removed = before - items.len();

        if removed > 0 {
            self.storage.save_items(&items)?;
            info!("Deleted {} item(s)", removed);
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<usize, StoreError> {
        let removed = self.storage.load_items()?.len();
        self.storage.save_items(&[])?;
        info!("Cleared {} item(s)", removed);
        Ok(removed)
    }

    pub fn search(&self, filter: &ItemFilter) -> Result<Vec<ClipboardItem>, StoreError> {
        Ok(filter_items(&self.storage.load_items()?, filter))
    }

    pub fn suggestions(&self, query: &str, limit: usize) -> Result<Vec<ClipboardItem>, StoreError> {
        Ok(rank_suggestions(query, &self.storage.load_items()?, limit))
    }

    pub fn boards(&self) -> Result<Vec<Board>, StoreError> {
        Ok(self.storage.load_boards()?)
    }

    pub fn create_board(&mut self, name: &str, color: Option<&str>) -> Result<Board, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidBoard("name is empty".to_string()));
        }
        let color = color.unwrap_or(DEFAULT_BOARD_COLOR);
        if !BOARD_COLOR_RE.is_match(color) {
            return Err(StoreError::InvalidBoard(format!(
                "color must look like #rrggbb, got {}",
                color
            )));
        }

        let mut boards = self.storage.load_boards()?;
        let lowered = name.to_lowercase();
        if boards.iter().any(|b| b.name.to_lowercase() == lowered) {
            return Err(StoreError::InvalidBoard(format!("{} already exists", name)));
        }

        let board = Board::new(name, color);
        boards.push(board.clone());
        self.storage.save_boards(&boards)?;
        info!("Created board {} ({})", board.name, board.id);
        Ok(board)
    }

    /// Delete a non-default board, moving its items to the default board.
    ///
    /// Returns the number of items reassigned.
    pub fn delete_board(&mut self, id: Uuid) -> Result<usize, StoreError> {
        let mut boards = self.storage.load_boards()?;
        let board = boards
            .iter()
            .find(|b| b.id == id)
            .ok_or(StoreError::BoardNotFound(id))?;
        if board.is_default {
            return Err(StoreError::DefaultBoard);
        }
        boards.retain(|b| b.id != id);

        let default_board = match boards.iter().find(|b| b.is_default) {
            Some(board) => board.id,
            None => {
                warn!("No default board while deleting {}, recreating it", id);
                let board = Board::default_board();
                let board_id = board.id;
                boards.insert(0, board);
                board_id
            }
        };

        let mut items = self.storage.load_items()?;
        let mut moved = 0;
        for item in items.iter_mut().filter(|item| item.board_id == Some(id)) {
            item.board_id = Some(default_board);
            moved += 1;
        }

        self.storage.save_items_and_boards(&items, &boards)?;
        info!("Deleted board {}, moved {} item(s) to the default board", id, moved);
        Ok(moved)
    }

    pub fn settings(&self) -> Result<Settings, StoreError> {
        Ok(self.storage.load_settings()?)
    }

    /// Update settings; a lower `maxItems` truncates the store right away
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<Settings, StoreError> {
        let settings = self.storage.load_settings()?.patched(patch)?;
        let mut items = self.storage.load_items()?;
        let evicted = evict_overflow(&mut items, settings.max_items);

        if evicted > 0 {
            info!("Settings lowered capacity to {}, evicted {} item(s)", settings.max_items, evicted);
            self.storage.save_settings_and_items(&settings, &items)?;
        } else {
            self.storage.save_settings(&settings)?;
        }
        Ok(settings)
    }
}

/// Truncate `items` from the tail down to `max_items`; returns how many were dropped
fn evict_overflow(items: &mut Vec<ClipboardItem>, max_items: usize) -> usize {
    let cap = max_items.max(1);
    if items.len() <= cap {
        return 0;
    }
    let evicted = items.len() - cap;
    items.truncate(cap);
    evicted
}

type Job = Box<dyn FnOnce(&mut ItemStore) + Send>;

/// Cloneable handle to the store task
#[derive(Clone)]
pub struct StoreHandle {
    jobs: mpsc::Sender<Job>,
}

/// Move `store` into its own task and return a handle to it
pub fn spawn(mut store: ItemStore) -> StoreHandle {
    let (jobs, mut queue) = mpsc::channel::<Job>(STORE_QUEUE_CAPACITY);

    tokio::spawn(async move {
        while let Some(job) = queue.recv().await {
            job(&mut store);
        }
        debug!("Store task stopped, all handles dropped");
    });

    StoreHandle { jobs }
}

impl StoreHandle {
    async fn call<R, F>(&self, op: F) -> Result<R, StoreError>
    where
        R: Send + 'static,
        F: FnOnce(&mut ItemStore) -> Result<R, StoreError> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |store| {
            // The caller may have gone away; nothing to do then
            let _ = reply_tx.send(op(store));
        });

        self.jobs.send(job).await.map_err(|_| StoreError::Closed)?;
        reply_rx.await.map_err(|_| StoreError::Closed)?
    }

    pub async fn insert(&self, new: NewItem) -> Result<ClipboardItem, StoreError> {
        self.call(move |store| store.insert(new)).await
    }

    pub async fn list(&self) -> Result<Vec<ClipboardItem>, StoreError> {
        self.call(|store| store.list()).await
    }

    pub async fn get(&self, id: Uuid) -> Result<ClipboardItem, StoreError> {
        self.call(move |store| store.get(id)).await
    }

    pub async fn update(&self, id: Uuid, patch: ItemPatch) -> Result<ClipboardItem, StoreError> {
        self.call(move |store| store.update(id, patch)).await
    }

    pub async fn toggle_pin(&self, id: Uuid) -> Result<ClipboardItem, StoreError> {
        self.call(move |store| store.toggle_pin(id)).await
    }

    pub async fn toggle_favorite(&self, id: Uuid) -> Result<ClipboardItem, StoreError> {
        self.call(move |store| store.toggle_favorite(id)).await
    }

    pub async fn delete_many(&self, ids: Vec<Uuid>) -> Result<usize, StoreError> {
        self.call(move |store| store.delete_many(&ids)).await
    }

    pub async fn clear(&self) -> Result<usize, StoreError> {
        self.call(|store| store.clear()).await
    }

    pub async fn search(&self, filter: ItemFilter) -> Result<Vec<ClipboardItem>, StoreError> {
        self.call(move |store| store.search(&filter)).await
    }

    pub async fn suggestions(&self, query: String, limit: usize) -> Result<Vec<ClipboardItem>, StoreError> {
        self.call(move |store| store.suggestions(&query, limit)).await
    }

    pub async fn boards(&self) -> Result<Vec<Board>, StoreError> {
        self.call(|store| store.boards()).await
    }

    pub async fn create_board(&self, name: String, color: Option<String>) -> Result<Board, StoreError> {
        self.call(move |store| store.create_board(&name, color.as_deref()))
            .await
    }

    pub async fn delete_board(&self, id: Uuid) -> Result<usize, StoreError> {
        self.call(move |store| store.delete_board(id)).await
    }

    pub async fn settings(&self) -> Result<Settings, StoreError> {
        self.call(|store| store.settings()).await
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        self.call(move |store| store.update_settings(&patch)).await
    }
}
