use serde::{Deserialize, Serialize};
use std::fmt;

use super::registry::ContainerId;

/// Permanent total-order key, assigned once when an item is created
pub type Rank = u64;

/// Opaque item identifier like `I-007`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

/// A content item or a category header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Stable identity, never reused within a session
    pub id: ItemId,
    /// Global rank (never renumbered)
    pub rank: Rank,
    /// Raw line text (the label, for a header)
    pub text: String,
    /// Presentation string; derived from rank and category when absent
    pub displayed_text: Option<String>,
    /// Category headers are immovable
    pub is_category_header: bool,
    /// Owning container, `None` while in the backlog
    pub(crate) container: Option<ContainerId>,
}

impl Item {
    pub fn new(id: ItemId, rank: Rank, text: String, is_category_header: bool) -> Self {
        Item {
            id,
            rank,
            text,
            displayed_text: None,
            is_category_header,
            container: None,
        }
    }

    /// The container holding this item, if any
    pub fn container(&self) -> Option<&ContainerId> {
        self.container.as_ref()
    }

    pub fn in_backlog(&self) -> bool {
        self.container.is_none()
    }
}

/// `"<ordinal>. <text>"`, the displayed form of a content item
pub fn numbered(ordinal: u64, text: &str) -> String {
    format!("{}. {}", ordinal, text)
}

/// Find the highest `<prefix><n>` number among `ids`. Numbers past `u32`
/// are treated as opaque ids so the counter never runs out.
pub fn max_id_number<'a>(ids: impl Iterator<Item = &'a str>, prefix_dash: &str) -> usize {
    let mut max = 0usize;
    for id in ids {
        if let Some(num_str) = id.strip_prefix(prefix_dash)
            && let Ok(n) = num_str.parse::<u32>()
            && n as usize > max
        {
            max = n as usize;
        }
    }
    max
}

/// Format a generated id, e.g. `I-001`
pub fn format_id(prefix: &str, num: usize) -> String {
    format!("{}-{:03}", prefix, num)
}
