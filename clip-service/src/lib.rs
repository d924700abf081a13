//! Clipboard manager service library
//!
//! Classifies and stores clipboard captures in a bounded local store, serves
//! the dispatcher protocol over a Unix socket, and provides the page agent
//! that captures selections and watches the system clipboard.

pub mod agent;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod item;
pub mod logging;
pub mod message;
pub mod notify;
pub mod search;
pub mod settings;
pub mod storage;
pub mod store;
pub mod sync;
pub mod transport;
pub mod watcher;

pub use agent::{Chord, PageAgent, SystemClipboard};
pub use classifier::{classify, derive_title};
pub use config::Config;
pub use dispatcher::{ClipServer, Dispatcher};
pub use item::{Board, ClipboardItem, ContentType, NewItem};
pub use message::{Request, Response};
pub use settings::Settings;
pub use storage::Storage;
pub use store::{ItemStore, StoreHandle};
pub use transport::ServiceClient;
