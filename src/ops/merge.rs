use crate::model::item::{ItemId, Rank, numbered};
use crate::model::ledger::next_rank_after_import;
use crate::model::session::Session;
use crate::parse::TextDocument;

/// Why a merge was refused. The session is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("the new file must have exactly one category, found {0}")]
    IncomingCategoryCount(usize),
    #[error("the session must show exactly one category, found {0}")]
    SessionCategoryCount(usize),
    #[error("category {incoming:?} does not match the session's {existing:?}")]
    CategoryMismatch { existing: String, incoming: String },
    #[error("items have already been sorted into boxes")]
    ContainersPopulated,
    #[error("only a delimited-text file can be merged")]
    NotDelimitedText,
    #[error("no room for {needed} more ranks, {left} left")]
    RanksExhausted { needed: usize, left: u64 },
}

/// Items added by a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub category: String,
    pub added: Vec<ItemId>,
    pub first_rank: Rank,
}

/// Append a single-category file to the backlog under the session's one
/// category, continuing ranks after the highest existing one.
pub fn merge_import_into_session(
    session: &mut Session,
    doc: &TextDocument,
) -> Result<MergeResult, MergeError> {
    let incoming = match doc.categories.as_slice() {
        [only] => only,
        other => return Err(MergeError::IncomingCategoryCount(other.len())),
    };

    let headers: Vec<_> = session.ledger.headers().collect();
    let header = match headers.as_slice() {
        [only] => *only,
        other => return Err(MergeError::SessionCategoryCount(other.len())),
    };
    if header.text != incoming.label {
        return Err(MergeError::CategoryMismatch {
            existing: header.text.clone(),
            incoming: incoming.label.clone(),
        });
    }
    if session.registry.iter().any(|c| !c.is_empty()) {
        return Err(MergeError::ContainersPopulated);
    }

    let left = session.ledger.ranks_left();
    if !u64::try_from(incoming.items.len()).is_ok_and(|needed| needed <= left) {
        return Err(MergeError::RanksExhausted {
            needed: incoming.items.len(),
            left,
        });
    }

    let header_rank = header.rank;
    let first_rank = session
        .max_rank()
        .and_then(next_rank_after_import)
        .unwrap_or_default();

    let mut added = Vec::with_capacity(incoming.items.len());
    for text in &incoming.items {
        let item = session.ledger.create(text.clone(), false);
        item.displayed_text = Some(numbered(item.rank - header_rank, text));
        added.push(item.id.clone());
    }

    tracing::debug!(
        category = %incoming.label,
        added = added.len(),
        first_rank,
        "merged file into session"
    );
    Ok(MergeResult {
        category: incoming.label.clone(),
        added,
        first_rank,
    })
}
