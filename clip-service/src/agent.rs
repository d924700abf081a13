//! Page agent: the side of the system that can see the user's selection and
//! the system clipboard.
//!
//! It answers `getSelectedText` / `copyToClipboard` for the dispatcher,
//! captures the selection when its local shortcut is pressed, and polls the
//! clipboard so changes are saved while `autoSaveClipboard` is on. Every
//! capture is sent to the dispatcher as `addClipboardItem`.

use crate::capture::{ensure_capturable, CaptureError};
use crate::item::{ClipboardItem, NewItem};
use crate::message::{Request, Response};
use crate::notify::{saved_message, LogNotifier, Notifier};
use crate::transport::{Handler, ServiceClient, TransportError};
use crate::watcher::{ClipboardWatcher, Observation};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_CHORD: &str = "Ctrl+Shift+C";

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),
    #[error("Selection unavailable: {0}")]
    Selection(String),
    #[error("Invalid shortcut {0:?}: {1}")]
    InvalidChord(String, String),
    #[error("Dispatcher error: {0}")]
    Transport(#[from] TransportError),
    #[error("Dispatcher rejected the request: {0}")]
    Rejected(String),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Read/write access to the system clipboard
pub trait ClipboardAccess: Send + Sync {
    fn read_text(&self) -> Result<String, AgentError>;
    fn write_text(&self, text: &str) -> Result<(), AgentError>;
}

/// Source of the user's current selection
pub trait SelectionSource: Send + Sync {
    fn selected_text(&self) -> Result<String, AgentError>;
}

/// System clipboard through arboard. A fresh handle is opened per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

fn open_clipboard() -> Result<arboard::Clipboard, AgentError> {
    arboard::Clipboard::new().map_err(|e| AgentError::Clipboard(e.to_string()))
}

impl ClipboardAccess for SystemClipboard {
    fn read_text(&self) -> Result<String, AgentError> {
        open_clipboard()?
            .get_text()
            .map_err(|e| AgentError::Clipboard(e.to_string()))
    }

    fn write_text(&self, text: &str) -> Result<(), AgentError> {
        open_clipboard()?
            .set_text(text.to_string())
            .map_err(|e| AgentError::Clipboard(e.to_string()))
    }
}

#[cfg(target_os = "linux")]
impl SelectionSource for SystemClipboard {
    /// The X11/Wayland primary selection
    fn selected_text(&self) -> Result<String, AgentError> {
        use arboard::{GetExtLinux, LinuxClipboardKind};

        open_clipboard()?
            .get()
            .clipboard(LinuxClipboardKind::Primary)
            .text()
            .map_err(|e| AgentError::Selection(e.to_string()))
    }
}

#[cfg(not(target_os = "linux"))]
impl SelectionSource for SystemClipboard {
    /// No primary selection outside Linux; the clipboard stands in
    fn selected_text(&self) -> Result<String, AgentError> {
        self.read_text()
            .map_err(|e| AgentError::Selection(e.to_string()))
    }
}

/// A key press reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    pub key: char,
}

/// Modifier+key shortcut, parsed from strings like `Ctrl+Shift+C`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord(KeyPress);

impl Chord {
    pub fn matches(&self, press: &KeyPress) -> bool {
        let own = &self.0;
        own.ctrl == press.ctrl
            && own.alt == press.alt
            && own.shift == press.shift
            && own.meta == press.meta
            && own.key.eq_ignore_ascii_case(&press.key)
    }

    /// The key press this chord stands for
    pub fn press(&self) -> KeyPress {
        self.0
    }
}

impl Default for Chord {
    fn default() -> Self {
        Self(KeyPress {
            ctrl: true,
            alt: false,
            shift: true,
            meta: false,
            key: 'C',
        })
    }
}

impl FromStr for Chord {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| AgentError::InvalidChord(s.to_string(), reason.to_string());

        let mut press = KeyPress {
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
            key: ' ',
        };
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let (key, modifiers) = parts.split_last().ok_or_else(|| invalid("empty"))?;

        for modifier in modifiers {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => press.ctrl = true,
                "alt" | "option" => press.alt = true,
                "shift" => press.shift = true,
                "cmd" | "command" | "meta" | "super" => press.meta = true,
                other => return Err(invalid(&format!("unknown modifier {:?}", other))),
            }
        }
        if !(press.ctrl || press.alt || press.shift || press.meta) {
            return Err(invalid("at least one modifier is required"));
        }

        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => press.key = c.to_ascii_uppercase(),
            _ => return Err(invalid("key must be a single letter or digit")),
        }

        Ok(Chord(press))
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let press = &self.0;
        let modifiers = [
            (press.ctrl, "Ctrl"),
            (press.alt, "Alt"),
            (press.shift, "Shift"),
            (press.meta, "Cmd"),
        ];
        for (_, name) in modifiers.iter().filter(|(on, _)| *on) {
            write!(f, "{}+", name)?;
        }
        write!(f, "{}", press.key)
    }
}

/// The page agent
pub struct PageAgent {
    dispatcher: ServiceClient,
    clipboard: Arc<dyn ClipboardAccess>,
    selection: Arc<dyn SelectionSource>,
    notifier: Arc<dyn Notifier>,
    chord: Chord,
    source_url: Option<String>,
    watcher: Mutex<ClipboardWatcher>,
}

impl PageAgent {
    pub fn new(
        dispatcher: ServiceClient,
        clipboard: Arc<dyn ClipboardAccess>,
        selection: Arc<dyn SelectionSource>,
    ) -> Self {
        Self {
            dispatcher,
            clipboard,
            selection,
            notifier: Arc::new(LogNotifier),
            chord: Chord::default(),
            source_url: None,
            watcher: Mutex::new(ClipboardWatcher::new()),
        }
    }

    pub fn with_chord(mut self, chord: Chord) -> Self {
        self.chord = chord;
        self
    }

    /// Page address attached to every capture
    pub fn with_source_url(mut self, source_url: Option<String>) -> Self {
        self.source_url = source_url;
        self
    }

    pub fn chord(&self) -> Chord {
        self.chord
    }

    /// Send `text` to the dispatcher as a new item and show a toast
    pub async fn capture(&self, text: String) -> Result<ClipboardItem, AgentError> {
        ensure_capturable(&text)?;

        let request = Request::AddClipboardItem {
            item: NewItem::from_text(text).with_source_url(self.source_url.clone()),
        };
        let response = self.dispatcher.send(&request).await?;

        match response.item {
            Some(item) if response.is_success() => {
                self.notifier.notify(&saved_message(&item.title));
                Ok(item)
            }
            _ => Err(AgentError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "response carried no item".to_string()),
            )),
        }
    }

    /// Capture the selection when `press` matches the local shortcut
    pub async fn on_key(&self, press: &KeyPress) -> Result<Option<ClipboardItem>, AgentError> {
        if !self.chord.matches(press) {
            trace!("Ignoring key press {:?}", press);
            return Ok(None);
        }

        let text = self.selection.selected_text()?;
        if text.trim().is_empty() {
            debug!("Shortcut pressed with an empty selection");
            return Ok(None);
        }
        self.capture(text).await.map(Some)
    }

    /// One poll of the system clipboard.
    ///
    /// Saves the value when it changed since the last poll and auto-save is on.
    /// A changed value is only marked as handled once it is saved or auto-save
    /// is off, so a failed poll retries it next time.
    pub async fn poll_once(&self) -> Result<Option<ClipboardItem>, AgentError> {
        let text = self.clipboard.read_text()?;

        match self.lock_watcher().compare(&text) {
            Observation::Unchanged => return Ok(None),
            Observation::Seeded => {
                self.lock_watcher().record(&text);
                return Ok(None);
            }
            Observation::Changed => {}
        }

        if text.trim().is_empty() {
            self.lock_watcher().record(&text);
            return Ok(None);
        }

        if !self.auto_save_enabled().await? {
            trace!("Clipboard changed, auto-save is off");
            self.lock_watcher().record(&text);
            return Ok(None);
        }

        let item = self.capture(text.clone()).await?;
        self.lock_watcher().record(&text);
        Ok(Some(item))
    }

    fn lock_watcher(&self) -> MutexGuard<'_, ClipboardWatcher> {
        self.watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn auto_save_enabled(&self) -> Result<bool, AgentError> {
        let response = self.dispatcher.send(&Request::GetSettings).await?;
        match response.settings {
            Some(settings) => Ok(settings.auto_save_clipboard),
            None => Err(AgentError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "response carried no settings".to_string()),
            )),
        }
    }

    /// Poll the clipboard every `interval` until the task is dropped.
    /// Failed polls are logged and the loop carries on.
    pub async fn run_poller(&self, interval: Duration) {
        info!("Polling the clipboard every {:?}", interval);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(Some(item)) => debug!("Auto-saved clipboard item {}", item.id),
                Ok(None) => {}
                Err(e) => warn!("Clipboard poll failed: {}", e),
            }
        }
    }
}

#[async_trait]
impl Handler for PageAgent {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetSelectedText => match self.selection.selected_text() {
                Ok(text) => Response::text(text),
                Err(e) => {
                    warn!("Could not read the selection: {}", e);
                    Response::text(String::new())
                }
            },
            Request::CopyToClipboard { text } => match self.clipboard.write_text(&text) {
                Ok(()) => {
                    // Our own write is not a user change for the poller
                    self.lock_watcher().record(&text);
                    Response::ok()
                }
                Err(e) => {
                    warn!("Could not write the clipboard: {}", e);
                    Response::failure(&e.to_string())
                }
            },
            _ => Response::unknown_action(),
        }
    }
}
