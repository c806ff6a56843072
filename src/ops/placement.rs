use crate::model::item::{ItemId, Rank};
use crate::model::registry::ContainerId;
use crate::model::session::Session;

/// Error type for placement operations
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),
    #[error("box not found: {0}")]
    ContainerNotFound(ContainerId),
    #[error("{0} is a category header and cannot be moved")]
    CategoryHeader(ItemId),
    #[error("{item} is already in box {container}")]
    AlreadyInContainer { item: ItemId, container: ContainerId },
    #[error("{0} is not in a box")]
    NotInContainer(ItemId),
}

/// Outcome of a move: the boxes whose contents changed, so whoever draws
/// them can recompute their bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub item: ItemId,
    pub resized: Vec<ContainerId>,
}

/// Put an item at the end of a box.
///
/// An item already held by a different box is taken out of it first, so it
/// is never in two places.
pub fn move_to_container(
    session: &mut Session,
    item_id: &ItemId,
    container_id: &ContainerId,
) -> Result<Placement, PlacementError> {
    let item = session
        .ledger
        .get(item_id)
        .ok_or_else(|| PlacementError::ItemNotFound(item_id.clone()))?;
    if item.is_category_header {
        return Err(PlacementError::CategoryHeader(item_id.clone()));
    }
    if session.registry.get(container_id).is_none() {
        return Err(PlacementError::ContainerNotFound(container_id.clone()));
    }
    let previous = item.container.clone();
    if previous.as_ref() == Some(container_id) {
        return Err(PlacementError::AlreadyInContainer {
            item: item_id.clone(),
            container: container_id.clone(),
        });
    }

    let mut resized = Vec::new();
    match previous {
        Some(ref from) => {
            splice_out(session, from, item_id);
            resized.push(from.clone());
        }
        None => session.ledger.backlog_mut().retain(|id| id != item_id),
    }

    if let Some(container) = session.registry.get_mut(container_id) {
        container.members.push(item_id.clone());
    }
    if let Some(item) = session.ledger.get_mut(item_id) {
        item.container = Some(container_id.clone());
    }
    resized.push(container_id.clone());

    tracing::debug!(item = %item_id, container = %container_id, "moved item into box");
    Ok(Placement {
        item: item_id.clone(),
        resized,
    })
}

/// Take an item out of its box and put it back into the backlog at the
/// position its rank dictates.
pub fn return_to_backlog(session: &mut Session, item_id: &ItemId) -> Result<Placement, PlacementError> {
    let item = session
        .ledger
        .get(item_id)
        .ok_or_else(|| PlacementError::ItemNotFound(item_id.clone()))?;
    let from = item
        .container
        .clone()
        .ok_or_else(|| PlacementError::NotInContainer(item_id.clone()))?;
    let rank = item.rank;

    splice_out(session, &from, item_id);
    if let Some(item) = session.ledger.get_mut(item_id) {
        item.container = None;
    }

    let ranks: Vec<Rank> = session
        .ledger
        .backlog_in_order()
        .iter()
        .map(|i| i.rank)
        .collect();
    let index = rank_insertion_index(&ranks, rank);
    session.ledger.backlog_mut().insert(index, item_id.clone());

    tracing::debug!(item = %item_id, container = %from, index, "returned item to backlog");
    Ok(Placement {
        item: item_id.clone(),
        resized: vec![from],
    })
}

/// Index at which an item of `rank` re-enters a backlog whose ranks are
/// `backlog_ranks` (ascending): before the first strictly greater rank,
/// or at the end.
pub fn rank_insertion_index(backlog_ranks: &[Rank], rank: Rank) -> usize {
    backlog_ranks
        .iter()
        .position(|&r| r > rank)
        .unwrap_or(backlog_ranks.len())
}

/// Remove a member, leaving the others in their relative order.
fn splice_out(session: &mut Session, container_id: &ContainerId, item_id: &ItemId) {
    if let Some(container) = session.registry.get_mut(container_id)
        && let Some(pos) = container.members.iter().position(|m| m == item_id)
    {
        container.members.remove(pos);
    }
}
