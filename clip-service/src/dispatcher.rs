//! Capture dispatcher: the socket service that owns the item store
//!
//! Serves the message protocol for the page agent, the native host and the
//! CLI. Requests that need the page (selection, system clipboard) are relayed
//! to the page agent's socket.

use crate::config::ServerConfig;
use crate::item::{ClipboardItem, NewItem};
use crate::message::{Request, Response};
use crate::notify::{saved_message, LogNotifier, Notifier};
use crate::search::DEFAULT_SUGGESTION_LIMIT;
use crate::storage::Storage;
use crate::store::{self, ItemStore, StoreError, StoreHandle};
use crate::sync::{forward_item, spawn_sync_timer, RemoteSync};
use crate::transport::{self, Handler, ServiceClient};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const AGENT_UNAVAILABLE: &str = "Page agent unavailable";
const NOTHING_SELECTED: &str = "Nothing selected";

/// Request handler backed by the store task
pub struct Dispatcher {
    store: StoreHandle,
    agent: Option<ServiceClient>,
    remote: Option<Arc<dyn RemoteSync>>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            agent: None,
            remote: None,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Relay selection and clipboard requests to the page agent at this socket
    pub fn with_agent(mut self, agent: ServiceClient) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteSync>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Insert an item, then hand it to remote sync when enabled
    async fn save(&self, new: NewItem) -> Result<ClipboardItem, StoreError> {
        let item = self.store.insert(new).await?;

        match self.store.settings().await {
            Ok(settings) => forward_item(self.remote.as_ref(), &settings, &item).await,
            Err(e) => warn!("Saved item {} but could not read settings: {}", item.id, e),
        }

        Ok(item)
    }

    async fn relay_to_agent(&self, request: &Request) -> Response {
        let Some(agent) = &self.agent else {
            return Response::error(AGENT_UNAVAILABLE);
        };

        match agent.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Page agent request failed: {}", e);
                Response::error(&format!("{}: {}", AGENT_UNAVAILABLE, e))
            }
        }
    }

    /// Keyboard-command capture: read the selection when no text is given,
    /// mirror it to the system clipboard, save it and notify.
    async fn quick_copy(&self, text: Option<String>, source_url: Option<String>) -> Response {
        let text = match text {
            Some(text) => text,
            None => {
                let response = self.relay_to_agent(&Request::GetSelectedText).await;
                if let Some(error) = response.error {
                    return Response::failure(&error);
                }
                response.text.unwrap_or_default()
            }
        };

        if text.trim().is_empty() {
            return Response::failure(NOTHING_SELECTED);
        }

        let copied = self
            .relay_to_agent(&Request::CopyToClipboard { text: text.clone() })
            .await;
        if !copied.is_success() {
            warn!(
                "Could not write selection to the system clipboard: {}",
                copied.error.as_deref().unwrap_or("unknown error")
            );
        }

        match self.save(NewItem::from_text(text).with_source_url(source_url)).await {
            Ok(item) => {
                self.notifier.notify(&saved_message(&item.title));
                Response::saved(item)
            }
            Err(e) => store_failure(e),
        }
    }
}

#[async_trait]
impl Handler for Dispatcher {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::AddClipboardItem { item } => match self.save(item).await {
                Ok(item) => Response::saved(item),
                Err(e) => store_failure(e),
            },
            Request::GetClipboardItems => respond(self.store.list().await, Response::items),
            request @ (Request::GetSelectedText | Request::CopyToClipboard { .. }) => {
                self.relay_to_agent(&request).await
            }
            Request::QuickCopy { text, source_url } => self.quick_copy(text, source_url).await,
            Request::UpdateClipboardItem { id, patch } => {
                respond(self.store.update(id, patch).await, Response::saved)
            }
            Request::DeleteClipboardItems { ids } => {
                respond(self.store.delete_many(ids).await, Response::count)
            }
            Request::ClearClipboardItems => respond(self.store.clear().await, Response::count),
            Request::TogglePin { id } => respond(self.store.toggle_pin(id).await, Response::saved),
            Request::ToggleFavorite { id } => {
                respond(self.store.toggle_favorite(id).await, Response::saved)
            }
            Request::SearchItems { filter } => {
                respond(self.store.search(filter).await, Response::items)
            }
            Request::GetSuggestions { query, limit } => respond(
                self.store
                    .suggestions(query, limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT))
                    .await,
                Response::items,
            ),
            Request::GetBoards => respond(self.store.boards().await, Response::boards),
            Request::CreateBoard { name, color } => {
                respond(self.store.create_board(name, color).await, Response::board)
            }
            Request::DeleteBoard { id } => respond(self.store.delete_board(id).await, Response::count),
            Request::GetSettings => respond(self.store.settings().await, Response::settings),
            Request::UpdateSettings { settings } => {
                respond(self.store.update_settings(settings).await, Response::settings)
            }
            Request::Unknown => Response::unknown_action(),
        }
    }
}

fn respond<T>(result: Result<T, StoreError>, into_response: impl FnOnce(T) -> Response) -> Response {
    match result {
        Ok(value) => into_response(value),
        Err(e) => store_failure(e),
    }
}

fn store_failure(e: StoreError) -> Response {
    error!("Store operation failed: {}", e);
    Response::failure(&e.to_string())
}

struct TimerGuard(JoinHandle<()>);

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Dispatcher bound to a socket, with its store and sync timer
pub struct ClipServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl ClipServer {
    /// Open storage and start the store task. Must run inside a tokio runtime.
    pub fn new(config: ServerConfig) -> Result<Self, StoreError> {
        let storage = Storage::open(&config.db_path)?;
        let handle = store::spawn(ItemStore::new(storage)?);

        let mut dispatcher = Dispatcher::new(handle);
        if let Some(agent_socket) = &config.agent_socket_path {
            dispatcher = dispatcher.with_agent(ServiceClient::new(agent_socket));
        }

        Ok(Self::from_dispatcher(config, dispatcher))
    }

    pub fn from_dispatcher(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Start the sync timer and serve connections until the task is dropped
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = transport::bind(&self.config.socket_path)?;
        info!("Clipboard dispatcher listening on {:?}", self.config.socket_path);

        // Stops the timer even when this future is dropped mid-serve
        let _timer = TimerGuard(spawn_sync_timer(
            self.dispatcher.store().clone(),
            self.dispatcher.remote.clone(),
        ));
        transport::serve(listener, Arc::clone(&self.dispatcher)).await
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ContentType;
    use crate::settings::SettingsPatch;
    use crate::sync::SyncError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn dispatcher() -> Dispatcher {
        let store = ItemStore::new(Storage::open_in_memory().unwrap()).unwrap();
        Dispatcher::new(store::spawn(store))
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<String>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[derive(Default)]
    struct CountingRemote(AtomicUsize);

    #[async_trait]
    impl RemoteSync for CountingRemote {
        async fn push(&self, _item: &ClipboardItem) -> Result<(), SyncError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn tick(&self, _settings: &crate::settings::Settings) -> Result<(), SyncError> {
            Ok(())
        }
    }

    fn add(content: &str) -> Request {
        Request::AddClipboardItem {
            item: NewItem::from_text(content),
        }
    }

    #[tokio::test]
    async fn test_add_and_get_items() {
        let dispatcher = dispatcher();

        let response = dispatcher.handle(add("SELECT * FROM users")).await;
        assert_eq!(response.success, Some(true));
        let item = response.item.unwrap();
        assert_eq!(item.content_type, ContentType::Code);
        assert_eq!(item.title, "SELECT * FROM users");

        dispatcher.handle(add("https://openai.com/blog/x")).await;
        let items = dispatcher
            .handle(Request::GetClipboardItems)
            .await
            .items
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content_type, ContentType::Link);
    }

    #[tokio::test]
    async fn test_blank_item_is_rejected() {
        let response = dispatcher().handle(add("   ")).await;
        assert_eq!(response.success, Some(false));
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let response = dispatcher().handle(Request::Unknown).await;
        assert_eq!(response, Response::unknown_action());
    }

    #[tokio::test]
    async fn test_page_requests_without_agent() {
        let dispatcher = dispatcher();
        let response = dispatcher.handle(Request::GetSelectedText).await;
        assert_eq!(response.error.as_deref(), Some(AGENT_UNAVAILABLE));

        // Quick copy with explicit text still saves without an agent
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = dispatcher.with_notifier(notifier.clone());
        let response = dispatcher
            .handle(Request::QuickCopy {
                text: Some("const answer = 42;".to_string()),
                source_url: Some("https://example.com/page".to_string()),
            })
            .await;
        let item = response.item.unwrap();
        assert_eq!(item.content_type, ContentType::Code);
        assert_eq!(item.source_url.as_deref(), Some("https://example.com/page"));
        assert_eq!(notifier.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_quick_copy_without_selection_fails() {
        let response = dispatcher()
            .handle(Request::QuickCopy {
                text: None,
                source_url: None,
            })
            .await;
        assert_eq!(response.success, Some(false));
    }

    #[tokio::test]
    async fn test_auto_sync_forwards_only_when_enabled() {
        let remote = Arc::new(CountingRemote::default());
        let dispatcher = dispatcher().with_remote(remote.clone());

        dispatcher.handle(add("one")).await;
        assert_eq!(remote.0.load(Ordering::SeqCst), 0);

        dispatcher
            .handle(Request::UpdateSettings {
                settings: SettingsPatch {
                    auto_sync: Some(true),
                    ..SettingsPatch::default()
                },
            })
            .await;
        dispatcher.handle(add("two")).await;
        assert_eq!(remote.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_board_lifecycle() {
        let dispatcher = dispatcher();
        let board = dispatcher
            .handle(Request::CreateBoard {
                name: "Snippets".to_string(),
                color: Some("#10b981".to_string()),
            })
            .await
            .board
            .unwrap();

        dispatcher
            .handle(Request::AddClipboardItem {
                item: NewItem {
                    board_id: Some(board.id),
                    ..NewItem::from_text("fn main() {}")
                },
            })
            .await;

        let response = dispatcher.handle(Request::DeleteBoard { id: board.id }).await;
        assert_eq!(response.count, Some(1));

        let boards = dispatcher.handle(Request::GetBoards).await.boards.unwrap();
        assert_eq!(boards.len(), 1);
        let items = dispatcher
            .handle(Request::GetClipboardItems)
            .await
            .items
            .unwrap();
        assert_eq!(items[0].board_id, Some(boards[0].id));
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let dispatcher = dispatcher();
        let item = dispatcher.handle(add("note")).await.item.unwrap();

        let pinned = dispatcher
            .handle(Request::TogglePin { id: item.id })
            .await
            .item
            .unwrap();
        assert!(pinned.is_pinned);

        let response = dispatcher
            .handle(Request::DeleteClipboardItems { ids: vec![item.id] })
            .await;
        assert_eq!(response.count, Some(1));

        let response = dispatcher.handle(Request::ToggleFavorite { id: item.id }).await;
        assert_eq!(response.success, Some(false));
    }
}
