use std::collections::HashMap;

use serde::Serialize;

use crate::model::item::Rank;
use crate::model::session::Session;

/// Structured result from `bx check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
}

/// A broken model invariant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// Two items share a rank
    #[serde(rename = "duplicate_rank")]
    DuplicateRank { rank: Rank, item_ids: Vec<String> },
    /// Backlog sequence is not in ascending rank order
    #[serde(rename = "backlog_out_of_order")]
    BacklogOutOfOrder { item_id: String, rank: Rank, previous: Rank },
    /// An item is neither in the backlog nor in any box
    #[serde(rename = "unplaced_item")]
    UnplacedItem { item_id: String },
    /// An item appears in more than one place
    #[serde(rename = "multiple_locations")]
    MultipleLocations { item_id: String, locations: Vec<String> },
    /// An item's box reference disagrees with the box member lists
    #[serde(rename = "membership_mismatch")]
    MembershipMismatch {
        item_id: String,
        recorded: Option<String>,
        found_in: Option<String>,
    },
    /// A backlog entry or box member names an unknown item
    #[serde(rename = "dangling_reference")]
    DanglingReference { item_id: String, location: String },
    /// A category header was placed in a box
    #[serde(rename = "header_in_box")]
    HeaderInBox { item_id: String, box_id: String },
    /// A content item ranks before every category header
    #[serde(rename = "uncategorized_item")]
    UncategorizedItem { item_id: String },
}

const BACKLOG: &str = "backlog";

/// Validate every containment and ordering invariant of a session.
///
/// Read-only; the session is not modified.
pub fn check_session(session: &Session) -> CheckResult {
    let mut result = CheckResult::default();
    let ledger = session.ledger();

    // Duplicate ranks
    let mut by_rank: HashMap<Rank, Vec<String>> = HashMap::new();
    for item in ledger.iter() {
        by_rank.entry(item.rank).or_default().push(item.id.to_string());
    }
    let mut dupes: Vec<(Rank, Vec<String>)> =
        by_rank.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
    dupes.sort_by_key(|(rank, _)| *rank);
    for (rank, item_ids) in dupes {
        result.errors.push(CheckError::DuplicateRank { rank, item_ids });
    }

    // Locations: where each item actually sits
    let mut locations: HashMap<String, Vec<String>> = HashMap::new();
    let mut previous: Option<Rank> = None;
    for id in ledger.backlog_ids() {
        match ledger.get(id) {
            Some(item) => {
                if let Some(prev) = previous
                    && item.rank <= prev
                {
                    result.errors.push(CheckError::BacklogOutOfOrder {
                        item_id: id.to_string(),
                        rank: item.rank,
                        previous: prev,
                    });
                }
                previous = Some(item.rank);
                locations
                    .entry(id.to_string())
                    .or_default()
                    .push(BACKLOG.to_string());
            }
            None => result.errors.push(CheckError::DanglingReference {
                item_id: id.to_string(),
                location: BACKLOG.to_string(),
            }),
        }
    }
    for container in session.registry().iter() {
        for id in container.members() {
            match ledger.get(id) {
                Some(item) => {
                    if item.is_category_header {
                        result.errors.push(CheckError::HeaderInBox {
                            item_id: id.to_string(),
                            box_id: container.id.to_string(),
                        });
                    }
                    locations
                        .entry(id.to_string())
                        .or_default()
                        .push(container.id.to_string());
                }
                None => result.errors.push(CheckError::DanglingReference {
                    item_id: id.to_string(),
                    location: container.id.to_string(),
                }),
            }
        }
    }

    // Exactly one location, matching the item's own record
    let first_header = ledger.headers().map(|h| h.rank).min();
    for item in ledger.iter() {
        let id = item.id.to_string();
        let found = locations.remove(&id).unwrap_or_default();
        match found.as_slice() {
            [] => result.errors.push(CheckError::UnplacedItem { item_id: id.clone() }),
            [only] => {
                let recorded = item.container().map(|c| c.to_string());
                let actual = (only != BACKLOG).then(|| only.clone());
                if recorded != actual {
                    result.errors.push(CheckError::MembershipMismatch {
                        item_id: id.clone(),
                        recorded,
                        found_in: actual,
                    });
                }
            }
            _ => result.errors.push(CheckError::MultipleLocations {
                item_id: id.clone(),
                locations: found.clone(),
            }),
        }
        if !item.is_category_header && first_header.is_none_or(|h| item.rank < h) {
            result
                .errors
                .push(CheckError::UncategorizedItem { item_id: id });
        }
    }

    result.valid = result.errors.is_empty();
    result
}
