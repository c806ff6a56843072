use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::config::BoxesConfig;
use crate::model::item::{Item, ItemId, Rank, format_id, max_id_number};
use crate::model::ledger::{ITEM_ID_PREFIX, Ledger, LedgerError};
use crate::model::registry::{
    CONTAINER_ID_PREFIX, Container, ContainerId, Position, Registry, RegistryError,
};
use crate::model::session::Session;

/// The structured session document: boxes plus the backlog by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeDoc {
    pub sorted: Vec<SortedBox>,
    pub unsorted: IndexMap<String, UnsortedCategory>,
}

/// A box and its members in drop order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortedBox {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

/// A category header and its backlog items in rank order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsortedCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Set when the map key had to be disambiguated from the label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub rank: Option<RankValue>,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_text: Option<String>,
    #[serde(default)]
    pub rank: Option<RankValue>,
}

/// A rank as written in the file: a number, or an integer in a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RankValue {
    Number(serde_json::Number),
    Text(String),
}

impl RankValue {
    fn resolve(&self) -> Option<Rank> {
        match self {
            RankValue::Number(n) => n.as_u64(),
            RankValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<Rank> for RankValue {
    fn from(rank: Rank) -> Self {
        RankValue::Number(rank.into())
    }
}

/// Error type for structured import and export
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("item {text:?} has no id")]
    MissingId { text: String },
    #[error("{text:?} has no rank")]
    MissingRank { text: String },
    #[error("{text:?} has an invalid rank: {value}")]
    InvalidRank { text: String, value: String },
    #[error("item {text:?} is ranked before every category header")]
    Uncategorized { text: String },
    #[error("item {text:?} is listed under {listed:?} but its rank places it under {ranked_under:?}")]
    Misfiled {
        text: String,
        listed: String,
        ranked_under: String,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("could not serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Capture the full session: every box, then the backlog by category.
pub fn to_interchange(session: &Session) -> InterchangeDoc {
    let sorted = session
        .registry()
        .iter()
        .map(|container| SortedBox {
            id: Some(container.id.to_string()),
            title: container.title.clone(),
            position: container.position,
            items: container
                .members()
                .iter()
                .filter_map(|id| session.ledger().get(id))
                .map(|item| item_record(session, item))
                .collect(),
        })
        .collect();

    let mut unsorted = IndexMap::new();
    for category in session.backlog_categories() {
        let label = &category.header.text;
        let key = unique_key(label, &unsorted);
        let entry = UnsortedCategory {
            id: Some(category.header.id.to_string()),
            label: (key != *label).then(|| label.clone()),
            rank: Some(category.header.rank.into()),
            items: category
                .items
                .iter()
                .map(|item| item_record(session, item))
                .collect(),
        };
        unsorted.insert(key, entry);
    }

    InterchangeDoc { sorted, unsorted }
}

/// Pretty JSON for the whole session
pub fn serialize_session(session: &Session) -> Result<String, CodecError> {
    let mut out = serde_json::to_string_pretty(&to_interchange(session))?;
    out.push('\n');
    Ok(out)
}

fn item_record(session: &Session, item: &Item) -> ItemRecord {
    ItemRecord {
        id: Some(item.id.to_string()),
        text: item.text.clone(),
        displayed_text: Some(session.display_text(item)),
        rank: Some(item.rank.into()),
    }
}

/// Category labels are free-form and may repeat; repeated labels get a
/// `" (n)"` suffix on the key.
fn unique_key(label: &str, taken: &IndexMap<String, UnsortedCategory>) -> String {
    if !taken.contains_key(label) {
        return label.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{} ({})", label, n);
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Parse a structured document without interpreting it.
pub fn parse_interchange(source: &str) -> Result<InterchangeDoc, serde_json::Error> {
    serde_json::from_str(source)
}

/// Rebuild a session from a structured document.
///
/// Ids and ranks are kept exactly as written. Any missing or duplicate id
/// or rank aborts the whole load, as does a backlog item whose rank falls
/// under a different header than the one it is listed with.
pub fn from_interchange(doc: &InterchangeDoc, defaults: &BoxesConfig) -> Result<Session, CodecError> {
    let mut ledger = Ledger::new();
    let mut registry = Registry::new(defaults.clone());

    // Headers and boxes may omit their ids; number those after every id
    // the file does use.
    let item_prefix = format!("{}-", ITEM_ID_PREFIX);
    let mut last_item_id = max_id_number(
        doc.unsorted
            .values()
            .filter_map(|c| c.id.as_deref())
            .chain(all_records(doc).filter_map(|r| r.id.as_deref())),
        &item_prefix,
    );
    let box_prefix = format!("{}-", CONTAINER_ID_PREFIX);
    let mut last_box_id = max_id_number(
        doc.sorted.iter().filter_map(|b| b.id.as_deref()),
        &box_prefix,
    );

    // (header, item) as grouped in the file
    let mut listed = Vec::new();
    for (key, category) in &doc.unsorted {
        let label = category.label.clone().unwrap_or_else(|| key.clone());
        let rank = resolve_rank(category.rank.as_ref(), &label)?;
        let id = match category.id {
            Some(ref id) => ItemId(id.clone()),
            None => {
                last_item_id += 1;
                ItemId(format_id(ITEM_ID_PREFIX, last_item_id))
            }
        };
        let mut header = Item::new(id.clone(), rank, label.clone(), true);
        header.displayed_text = Some(label);
        ledger.restore(header)?;

        for record in &category.items {
            let item = restore_item(record, None)?;
            listed.push((id.clone(), item.id.clone()));
            ledger.restore(item)?;
        }
    }

    for sorted in &doc.sorted {
        let id = match sorted.id {
            Some(ref id) => ContainerId(id.clone()),
            None => {
                last_box_id += 1;
                ContainerId(format_id(CONTAINER_ID_PREFIX, last_box_id))
            }
        };
        let mut members = Vec::with_capacity(sorted.items.len());
        for record in &sorted.items {
            let item = restore_item(record, Some(id.clone()))?;
            members.push(item.id.clone());
            ledger.restore(item)?;
        }
        registry.restore(Container {
            id,
            title: sorted.title.clone(),
            position: sorted.position,
            members,
        })?;
    }

    ledger.sort_by_rank();
    let first_header = ledger.headers().map(|h| h.rank).min();
    if let Some(stray) = ledger
        .iter()
        .find(|i| !i.is_category_header && first_header.is_none_or(|h| i.rank < h))
    {
        return Err(CodecError::Uncategorized {
            text: stray.text.clone(),
        });
    }

    let session = Session::from_parts(ledger, registry);
    for (header_id, item_id) in &listed {
        let (Some(header), Some(item)) = (session.item(header_id), session.item(item_id)) else {
            continue;
        };
        if let Some(owner) = session.category_of(item)
            && owner.id != *header_id
        {
            return Err(CodecError::Misfiled {
                text: item.text.clone(),
                listed: header.text.clone(),
                ranked_under: owner.text.clone(),
            });
        }
    }

    Ok(session)
}

fn all_records(doc: &InterchangeDoc) -> impl Iterator<Item = &ItemRecord> {
    doc.unsorted
        .values()
        .flat_map(|c| c.items.iter())
        .chain(doc.sorted.iter().flat_map(|b| b.items.iter()))
}

fn restore_item(record: &ItemRecord, container: Option<ContainerId>) -> Result<Item, CodecError> {
    let id = record.id.clone().ok_or_else(|| CodecError::MissingId {
        text: record.text.clone(),
    })?;
    let rank = resolve_rank(record.rank.as_ref(), &record.text)?;
    let mut item = Item::new(ItemId(id), rank, record.text.clone(), false);
    item.displayed_text = record.displayed_text.clone();
    item.container = container;
    Ok(item)
}

fn resolve_rank(value: Option<&RankValue>, text: &str) -> Result<Rank, CodecError> {
    let value = value.ok_or_else(|| CodecError::MissingRank {
        text: text.to_string(),
    })?;
    value.resolve().ok_or_else(|| CodecError::InvalidRank {
        text: text.to_string(),
        value: match value {
            RankValue::Number(n) => n.to_string(),
            RankValue::Text(s) => s.clone(),
        },
    })
}
