//! Item filtering and search-suggestion ranking

use crate::item::{ClipboardItem, ContentType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queries shorter than this produce no suggestions
pub const MIN_SUGGESTION_QUERY_CHARS: usize = 2;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// Criteria for listing items; every set field must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFilter {
    /// Case-insensitive substring of title, content or a tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub pinned_only: bool,
    #[serde(default)]
    pub favorites_only: bool,
}

impl ItemFilter {
    pub fn matches(&self, item: &ClipboardItem) -> bool {
        if self.pinned_only && !item.is_pinned {
            return false;
        }
        if self.favorites_only && !item.is_favorite {
            return false;
        }
        if let Some(content_type) = self.content_type {
            if item.content_type != content_type {
                return false;
            }
        }
        if let Some(board_id) = self.board_id {
            if item.board_id != Some(board_id) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !item.has_tag(tag) {
                return false;
            }
        }
        match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => {
                let needle = query.to_lowercase();
                item.title.to_lowercase().contains(&needle)
                    || item.content.to_lowercase().contains(&needle)
                    || item.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Items matching `filter`, in store order (most recent first)
pub fn filter_items(items: &[ClipboardItem], filter: &ItemFilter) -> Vec<ClipboardItem> {
    items.iter().filter(|item| filter.matches(item)).cloned().collect()
}

/// Score of an item against a lowercase query; zero means no match
fn suggestion_score(item: &ClipboardItem, needle: &str) -> u32 {
    let title = item.title.to_lowercase();
    let mut score = if title.starts_with(needle) {
        3
    } else if title.contains(needle) {
        2
    } else {
        0
    };

    if item.tags.iter().any(|t| t.to_lowercase().contains(needle)) {
        score = score.max(2);
    }
    if score == 0 && item.content.to_lowercase().contains(needle) {
        score = 1;
    }
    score
}

/// Rank items as search suggestions for `query`.
///
/// Higher scores first; ties go to pinned items, then to the more recent item.
pub fn rank_suggestions(query: &str, items: &[ClipboardItem], limit: usize) -> Vec<ClipboardItem> {
    let query = query.trim();
    if query.chars().count() < MIN_SUGGESTION_QUERY_CHARS || limit == 0 {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    let mut scored: Vec<(u32, &ClipboardItem)> = items
        .iter()
        .map(|item| (suggestion_score(item, &needle), item))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .cmp(score_a)
            .then_with(|| b.is_pinned.cmp(&a.is_pinned))
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, item)| item.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::build_item;
    use crate::item::NewItem;
    use chrono::Duration;

    fn item(content: &str, tags: &[&str], minutes_ago: i64) -> ClipboardItem {
        let mut item = build_item(
            NewItem {
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..NewItem::from_text(content)
            },
            None,
        )
        .unwrap();
        item.created_at -= Duration::minutes(minutes_ago);
        item
    }

    #[test]
    fn test_filter_by_query_and_type() {
        let items = vec![
            item("https://docs.rs/tokio", &[], 0),
            item("tokio::spawn(async {})", &[], 1),
            item("grocery list", &["home"], 2),
        ];

        let filter = ItemFilter {
            query: Some("TOKIO".to_string()),
            ..ItemFilter::default()
        };
        assert_eq!(filter_items(&items, &filter).len(), 2);

        let filter = ItemFilter {
            query: Some("tokio".to_string()),
            content_type: Some(ContentType::Link),
            ..ItemFilter::default()
        };
        let found = filter_items(&items, &filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "https://docs.rs/tokio");
    }

    #[test]
    fn test_filter_flags_and_tags() {
        let mut items = vec![item("a", &["Work"], 0), item("b", &[], 1)];
        items[1].is_favorite = true;

        let favorites = ItemFilter {
            favorites_only: true,
            ..ItemFilter::default()
        };
        assert_eq!(filter_items(&items, &favorites)[0].content, "b");

        let tagged = ItemFilter {
            tag: Some("work".to_string()),
            ..ItemFilter::default()
        };
        assert_eq!(filter_items(&items, &tagged)[0].content, "a");

        assert!(filter_items(
            &items,
            &ItemFilter {
                pinned_only: true,
                ..ItemFilter::default()
            }
        )
        .is_empty());
    }

    #[test]
    fn test_tag_filter_ignores_non_ascii_case() {
        let items = vec![item("a", &["Ärger"], 0), item("b", &["ÉTÉ"], 1)];

        let tagged = ItemFilter {
            tag: Some("ärger".to_string()),
            ..ItemFilter::default()
        };
        let found = filter_items(&items, &tagged);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "a");

        assert!(items[1].has_tag(" été "));
    }

    #[test]
    fn test_filter_preserves_store_order() {
        let items = vec![item("note one", &[], 0), item("note two", &[], 5)];
        let found = filter_items(&items, &ItemFilter::default());
        assert_eq!(found, items);
    }

    #[test]
    fn test_suggestions_rank_title_prefix_first() {
        let items = vec![
            item("a note about rust", &[], 0),
            item("rust release notes", &[], 10),
            item("notes", &["rustlang"], 20),
        ];

        let ranked = rank_suggestions("rust", &items, 10);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].content, "rust release notes");
        // Substring match and tag match tie; the newer item wins
        assert_eq!(ranked[1].content, "a note about rust");
        assert_eq!(ranked[2].content, "notes");
    }

    #[test]
    fn test_suggestions_prefer_pinned_on_tie() {
        let mut items = vec![item("rust one", &[], 0), item("rust two", &[], 30)];
        items[1].is_pinned = true;

        let ranked = rank_suggestions("ru", &items, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].content, "rust two");
    }

    #[test]
    fn test_suggestions_content_only_match() {
        let items = vec![item("title line\nbody mentions serde", &[], 0)];
        let ranked = rank_suggestions("serde", &items, 5);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_short_query_yields_nothing() {
        let items = vec![item("rust", &[], 0)];
        assert!(rank_suggestions("r", &items, 5).is_empty());
        assert!(rank_suggestions("  ", &items, 5).is_empty());
        assert!(rank_suggestions("rust", &items, 0).is_empty());
    }
}
