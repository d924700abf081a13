//! Clipboard item and board records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of content held by an item, decided once at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Link,
    Image,
    Code,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Link => "link",
            ContentType::Image => "image",
            ContentType::Code => "code",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ContentType::Text),
            "link" => Ok(ContentType::Link),
            "image" => Ok(ContentType::Image),
            "code" => Ok(ContentType::Code),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

/// One saved piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardItem {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Uuid>,
    /// Page the content was captured from, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl ClipboardItem {
    /// Case-insensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }
}

/// A capture request: a clipboard item before it has an id.
///
/// `title` and `type` are derived when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl NewItem {
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_source_url(mut self, source_url: Option<String>) -> Self {
        self.source_url = source_url;
        self
    }
}

/// Partial update of an existing item; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Uuid>,
}

/// Named, coloured grouping of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_BOARD_NAME: &str = "General";
pub const DEFAULT_BOARD_COLOR: &str = "#6366f1";

impl Board {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: color.into(),
            is_default: false,
            created_at: Utc::now(),
        }
    }

    /// The catch-all board created on first open
    pub fn default_board() -> Self {
        Self {
            is_default: true,
            ..Self::new(DEFAULT_BOARD_NAME, DEFAULT_BOARD_COLOR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_wire_names() {
        let item = ClipboardItem {
            id: Uuid::nil(),
            title: "example.com".to_string(),
            content: "https://example.com".to_string(),
            content_type: ContentType::Link,
            tags: vec!["web".to_string()],
            is_pinned: true,
            is_favorite: false,
            created_at: Utc::now(),
            board_id: None,
            source_url: None,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "link");
        assert_eq!(json["isPinned"], true);
        assert_eq!(json["isFavorite"], false);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("boardId").is_none());
    }

    #[test]
    fn test_new_item_without_optional_fields() {
        let item: NewItem = serde_json::from_str(r#"{"content": "hello"}"#).unwrap();
        assert_eq!(item.content, "hello");
        assert!(item.content_type.is_none());
        assert!(item.tags.is_empty());
        assert!(!item.is_pinned);
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!("CODE".parse::<ContentType>().unwrap(), ContentType::Code);
        assert!("video".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_has_tag_ignores_case() {
        let mut item = ClipboardItem {
            id: Uuid::new_v4(),
            title: String::new(),
            content: "x".to_string(),
            content_type: ContentType::Text,
            tags: vec!["Work".to_string()],
            is_pinned: false,
            is_favorite: false,
            created_at: Utc::now(),
            board_id: None,
            source_url: None,
        };
        assert!(item.has_tag("work"));
        item.tags.clear();
        assert!(!item.has_tag("work"));
    }

    #[test]
    fn test_default_board() {
        let board = Board::default_board();
        assert!(board.is_default);
        assert_eq!(board.name, DEFAULT_BOARD_NAME);
    }
}
