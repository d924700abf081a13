//! Remote sync extension point and the periodic sync timer
//!
//! No remote protocol ships with the service. A `RemoteSync` implementation can
//! be registered with the dispatcher; without one, auto-sync only logs.

use crate::item::ClipboardItem;
use crate::settings::Settings;
use crate::store::StoreHandle;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Error, Debug)]
#[error("Remote sync failed: {0}")]
pub struct SyncError(pub String);

/// Collaborator that forwards items to a remote endpoint
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Called after every successful insert while `autoSync` is on
    async fn push(&self, item: &ClipboardItem) -> Result<(), SyncError>;

    /// Called on every timer tick while `autoSync` is on
    async fn tick(&self, settings: &Settings) -> Result<(), SyncError>;
}

/// Forward a freshly saved item when auto-sync is enabled
pub async fn forward_item(remote: Option<&Arc<dyn RemoteSync>>, settings: &Settings, item: &ClipboardItem) {
    if !settings.auto_sync {
        return;
    }

    match remote {
        Some(remote) => {
            if let Err(e) = remote.push(item).await {
                warn!("Auto-sync of item {} failed: {}", item.id, e);
            }
        }
        None => debug!("Auto-sync enabled but no remote is registered, item {} stays local", item.id),
    }
}

/// Spawn the timer that fires the sync hook every `syncInterval`.
///
/// The interval is re-read from settings before each sleep, so changes take
/// effect on the next cycle. Runs until the runtime shuts down.
pub fn spawn_sync_timer(store: StoreHandle, remote: Option<Arc<dyn RemoteSync>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let settings = match store.settings().await {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Sync timer could not read settings: {}", e);
                    Settings::default()
                }
            };

            tokio::time::sleep(settings.sync_period()).await;

            let settings = match store.settings().await {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Sync timer could not read settings: {}", e);
                    continue;
                }
            };
            run_sync_tick(remote.as_ref(), &settings).await;
        }
    })
}

async fn run_sync_tick(remote: Option<&Arc<dyn RemoteSync>>, settings: &Settings) {
    if !settings.auto_sync {
        return;
    }

    match remote {
        Some(remote) => {
            if let Err(e) = remote.tick(settings).await {
                warn!("Periodic sync failed: {}", e);
            }
        }
        None => debug!("Periodic sync tick, no remote registered"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::build_item;
    use crate::item::NewItem;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRemote {
        pushes: AtomicUsize,
        ticks: AtomicUsize,
    }

    #[async_trait]
    impl RemoteSync for CountingRemote {
        async fn push(&self, _item: &ClipboardItem) -> Result<(), SyncError> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn tick(&self, _settings: &Settings) -> Result<(), SyncError> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Err(SyncError("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_forward_respects_auto_sync() {
        let counting = Arc::new(CountingRemote::default());
        let remote: Arc<dyn RemoteSync> = counting.clone();
        let item = build_item(NewItem::from_text("x"), None).unwrap();

        forward_item(Some(&remote), &Settings::default(), &item).await;
        assert_eq!(counting.pushes.load(Ordering::SeqCst), 0);

        let enabled = Settings {
            auto_sync: true,
            ..Settings::default()
        };
        forward_item(Some(&remote), &enabled, &item).await;
        assert_eq!(counting.pushes.load(Ordering::SeqCst), 1);

        // No remote registered is not an error
        forward_item(None, &enabled, &item).await;
    }

    #[tokio::test]
    async fn test_tick_failure_is_swallowed() {
        let counting = Arc::new(CountingRemote::default());
        let remote: Arc<dyn RemoteSync> = counting.clone();
        let enabled = Settings {
            auto_sync: true,
            ..Settings::default()
        };

        run_sync_tick(Some(&remote), &enabled).await;
        run_sync_tick(Some(&remote), &Settings::default()).await;
        assert_eq!(counting.ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_on_interval() {
        use crate::settings::SettingsPatch;
        use crate::storage::Storage;
        use crate::store::{spawn, ItemStore};

        let store = spawn(ItemStore::new(Storage::open_in_memory().unwrap()).unwrap());
        store
            .update_settings(SettingsPatch {
                auto_sync: Some(true),
                sync_interval: Some(1_000),
                ..SettingsPatch::default()
            })
            .await
            .unwrap();

        let counting = Arc::new(CountingRemote::default());
        let remote: Arc<dyn RemoteSync> = counting.clone();
        let timer = spawn_sync_timer(store, Some(remote));

        tokio::time::sleep(std::time::Duration::from_millis(3_500)).await;
        assert!(counting.ticks.load(Ordering::SeqCst) >= 3);
        timer.abort();
    }
}
