//! Turning raw captured text into a stored clipboard item
//!
//! Every trigger (keyboard command, page-agent chord, clipboard poller, CLI)
//! builds its item here, so classification happens the same way everywhere.

use crate::classifier::{classify, derive_title};
use crate::item::{ClipboardItem, NewItem};
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Nothing to capture: content is empty")]
    Empty,
}

/// Reject empty or whitespace-only text
pub fn ensure_capturable(content: &str) -> Result<(), CaptureError> {
    if content.trim().is_empty() {
        return Err(CaptureError::Empty);
    }
    Ok(())
}

/// Build a clipboard item from a capture request.
///
/// The content type is classified when the request does not carry one and the
/// title is derived when it is missing or blank. Items without a board land in
/// `default_board`.
pub fn build_item(new: NewItem, default_board: Option<Uuid>) -> Result<ClipboardItem, CaptureError> {
    ensure_capturable(&new.content)?;

    let content_type = new.content_type.unwrap_or_else(|| classify(&new.content));
    let title = match new.title {
        Some(title) if !title.trim().is_empty() => title.trim().to_string(),
        _ => derive_title(&new.content, content_type),
    };

    Ok(ClipboardItem {
        id: Uuid::new_v4(),
        title,
        content: new.content,
        content_type,
        tags: normalize_tags(new.tags),
        is_pinned: new.is_pinned,
        is_favorite: new.is_favorite,
        created_at: Utc::now(),
        board_id: new.board_id.or(default_board),
        source_url: new.source_url,
    })
}

/// Trim tags, drop blanks and case-insensitive duplicates, keep first-seen order
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(tags.len());
    let mut out = Vec::with_capacity(tags.len());

    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let key = tag.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(tag.to_string());
    }

    out
}
