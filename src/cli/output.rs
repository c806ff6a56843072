use serde::Serialize;

use crate::model::item::Item;
use crate::model::registry::{Container, Position};
use crate::model::session::{BacklogCategory, Session};
use crate::ops::import::ImportOutcome;
use crate::util::unicode::{pad_right, pad_to_width};

/// Column width for box titles in `bx box list`
const TITLE_COLUMN: usize = 24;

/// Minimum column width for ids. Longer ids are printed whole.
const ID_COLUMN: usize = 6;

// ---------------------------------------------------------------------------
// JSON output structs
//
// `--json` output uses snake_case keys throughout. Only the session
// document (parse::interchange) keeps its camelCase `displayedText`.
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ItemJson {
    pub id: String,
    pub rank: u64,
    pub text: String,
    pub displayed_text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub header: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

#[derive(Serialize)]
pub struct CategoryJson {
    pub id: String,
    pub label: String,
    pub rank: u64,
    pub items: Vec<ItemJson>,
}

#[derive(Serialize)]
pub struct BoxJson {
    pub id: String,
    pub title: String,
    pub position: Position,
    pub items: Vec<ItemJson>,
}

#[derive(Serialize)]
pub struct ListJson {
    pub backlog: Vec<CategoryJson>,
    pub boxes: Vec<BoxJson>,
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportJson {
    Loaded {
        items: usize,
        boxes: usize,
    },
    Merged {
        category: String,
        added: Vec<String>,
        first_rank: u64,
    },
    Conflict {
        existing_items: usize,
        boxed_items: usize,
        incoming_items: usize,
        mergeable: bool,
    },
    Cancelled,
    Superseded,
}

#[derive(Serialize)]
pub struct PlacementJson {
    pub item: String,
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    pub resized: Vec<String>,
}

#[derive(Serialize)]
pub struct SearchHitJson {
    pub item: ItemJson,
    pub fields: Vec<crate::ops::search::MatchField>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn item_to_json(session: &Session, item: &Item) -> ItemJson {
    ItemJson {
        id: item.id.to_string(),
        rank: item.rank,
        text: item.text.clone(),
        displayed_text: session.display_text(item),
        header: item.is_category_header,
        category: if item.is_category_header {
            None
        } else {
            session.category_of(item).map(|h| h.text.clone())
        },
        container: item.container().map(|c| c.to_string()),
    }
}

pub fn category_to_json(session: &Session, category: &BacklogCategory<'_>) -> CategoryJson {
    CategoryJson {
        id: category.header.id.to_string(),
        label: category.header.text.clone(),
        rank: category.header.rank,
        items: category
            .items
            .iter()
            .map(|item| item_to_json(session, item))
            .collect(),
    }
}

pub fn box_to_json(session: &Session, container: &Container) -> BoxJson {
    BoxJson {
        id: container.id.to_string(),
        title: container.title.clone(),
        position: container.position,
        items: members(session, container)
            .map(|item| item_to_json(session, item))
            .collect(),
    }
}

pub fn list_to_json(session: &Session) -> ListJson {
    ListJson {
        backlog: session
            .backlog_categories()
            .iter()
            .map(|c| category_to_json(session, c))
            .collect(),
        boxes: session
            .registry()
            .iter()
            .map(|c| box_to_json(session, c))
            .collect(),
    }
}

pub fn import_to_json(outcome: &ImportOutcome) -> ImportJson {
    match outcome {
        ImportOutcome::Loaded { items, containers } => ImportJson::Loaded {
            items: *items,
            boxes: *containers,
        },
        ImportOutcome::Merged(result) => ImportJson::Merged {
            category: result.category.clone(),
            added: result.added.iter().map(|id| id.to_string()).collect(),
            first_rank: result.first_rank,
        },
        ImportOutcome::Conflict(c) => ImportJson::Conflict {
            existing_items: c.existing_items,
            boxed_items: c.boxed_items,
            incoming_items: c.incoming_items,
            mergeable: c.mergeable,
        },
        ImportOutcome::Cancelled => ImportJson::Cancelled,
        ImportOutcome::Superseded => ImportJson::Superseded,
    }
}

fn members<'a>(session: &'a Session, container: &'a Container) -> impl Iterator<Item = &'a Item> {
    container
        .members()
        .iter()
        .filter_map(|id| session.ledger().get(id))
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Format a single item as a one-line summary
pub fn format_item_line(session: &Session, item: &Item) -> String {
    format!(
        "{}  {}",
        pad_right(item.id.as_str(), ID_COLUMN),
        session.display_text(item)
    )
}

pub fn format_category_header(item: &Item) -> String {
    format!("== {} ({}) ==", item.text, item.id)
}

pub fn format_box_header(container: &Container) -> String {
    let title = if container.title.is_empty() {
        "(untitled)"
    } else {
        &container.title
    };
    format!("[{}] {} ({})", container.id, title, container.len())
}

/// Backlog by category, then every box with its members
pub fn format_listing(session: &Session) -> Vec<String> {
    let mut lines = Vec::new();

    for category in session.backlog_categories() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format_category_header(category.header));
        for item in &category.items {
            lines.push(format!("  {}", format_item_line(session, item)));
        }
    }

    for container in session.registry().iter() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format_box_header(container));
        for item in members(session, container) {
            lines.push(format!("  {}", format_item_line(session, item)));
        }
    }

    lines
}

/// One line per box: id, title column, member count, position
pub fn format_box_line(container: &Container) -> String {
    format!(
        "{}  {}  {:>3} items  @ ({}, {})",
        pad_right(container.id.as_str(), ID_COLUMN),
        pad_to_width(&container.title, TITLE_COLUMN),
        container.len(),
        container.position.x,
        container.position.y,
    )
}

/// Format detailed item view
pub fn format_item_detail(session: &Session, item: &Item) -> Vec<String> {
    let mut lines = vec![format_item_line(session, item)];
    lines.push(format!("text: {}", item.text));
    lines.push(format!("rank: {}", item.rank));
    if item.is_category_header {
        lines.push("category header".to_string());
        return lines;
    }
    if let Some(header) = session.category_of(item) {
        lines.push(format!("category: {} ({})", header.text, header.id));
    }
    match item.container().and_then(|c| session.registry().get(c)) {
        Some(container) => lines.push(format!("box: {} ({})", container.title, container.id)),
        None => lines.push("box: none (backlog)".to_string()),
    }
    lines
}

pub fn format_import_outcome(outcome: &ImportOutcome) -> String {
    match outcome {
        ImportOutcome::Loaded { items, containers } => {
            format!("loaded {} items, {} boxes", items, containers)
        }
        ImportOutcome::Merged(result) => {
            let last = result.first_rank + result.added.len().saturating_sub(1) as u64;
            format!(
                "merged {} items into {} (ranks {}..={})",
                result.added.len(),
                result.category,
                result.first_rank,
                last
            )
        }
        ImportOutcome::Conflict(c) => format!(
            "session already holds {} items ({} in boxes); the file has {}",
            c.existing_items, c.boxed_items, c.incoming_items
        ),
        ImportOutcome::Cancelled => "import cancelled".to_string(),
        ImportOutcome::Superseded => "import superseded by a newer one".to_string(),
    }
}
