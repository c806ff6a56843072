use indexmap::IndexMap;

use super::item::{Item, ItemId, Rank, format_id, max_id_number};

/// Prefix for generated item ids (`I-001`, `I-002`, ...)
pub const ITEM_ID_PREFIX: &str = "I";

/// Error type for ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("duplicate item id: {0}")]
    DuplicateId(ItemId),
    #[error("duplicate rank {rank} on item {id}")]
    DuplicateRank { rank: Rank, id: ItemId },
    #[error("rank {rank} on item {id} is the largest possible rank")]
    RankExhausted { rank: Rank, id: ItemId },
}

/// The authoritative item collection.
///
/// Items are keyed by id and kept in creation order (rank order after a
/// structured restore). The backlog is the rank-ordered sequence of every
/// item not currently held by a container; headers always live there.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    items: IndexMap<ItemId, Item>,
    backlog: Vec<ItemId>,
    next_rank: Rank,
    last_id: usize,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Create an item with the next unused rank and a fresh id.
    ///
    /// New items always land at the end of the backlog, since their rank
    /// exceeds every existing rank.
    ///
    /// Panics when no rank is left; callers adding items in bulk check
    /// [`Ledger::ranks_left`] first.
    pub fn create(&mut self, text: impl Into<String>, is_category_header: bool) -> &mut Item {
        let rank = self.next_rank;
        self.next_rank = match next_rank_after_import(rank) {
            Some(next) => next,
            None => panic!("ledger ran out of ranks after {}", rank),
        };
        self.last_id += 1;
        let id = ItemId(format_id(ITEM_ID_PREFIX, self.last_id));
        assert!(
            !self.items.contains_key(&id),
            "ledger generated duplicate item id {}",
            id
        );
        self.backlog.push(id.clone());
        let item = Item::new(id.clone(), rank, text.into(), is_category_header);
        let (idx, _) = self.items.insert_full(id, item);
        &mut self.items[idx]
    }

    /// Insert an item carrying a preserved id and rank.
    ///
    /// Call [`Ledger::sort_by_rank`] once the whole batch is restored.
    pub fn restore(&mut self, item: Item) -> Result<(), LedgerError> {
        if self.items.contains_key(&item.id) {
            return Err(LedgerError::DuplicateId(item.id));
        }
        if self.items.values().any(|existing| existing.rank == item.rank) {
            return Err(LedgerError::DuplicateRank {
                rank: item.rank,
                id: item.id,
            });
        }

        let Some(after) = next_rank_after_import(item.rank) else {
            return Err(LedgerError::RankExhausted {
                rank: item.rank,
                id: item.id,
            });
        };
        self.next_rank = self.next_rank.max(after);
        self.last_id = self
            .last_id
            .max(max_id_number(std::iter::once(item.id.as_str()), &id_prefix_dash()));
        if item.in_backlog() {
            self.backlog.push(item.id.clone());
        }
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Re-establish rank order for the item map and the backlog.
    pub(crate) fn sort_by_rank(&mut self) {
        self.items.sort_by(|_, a, _, b| a.rank.cmp(&b.rank));
        let items = &self.items;
        self.backlog
            .sort_by_key(|id| items.get(id).map(|i| i.rank).unwrap_or(Rank::MAX));
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// All items in creation (rank) order
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Category headers in rank order
    pub fn headers(&self) -> impl Iterator<Item = &Item> {
        self.items.values().filter(|i| i.is_category_header)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_rank(&self) -> Option<Rank> {
        self.items.values().map(|i| i.rank).max()
    }

    /// How many more items [`Ledger::create`] can rank
    pub fn ranks_left(&self) -> u64 {
        Rank::MAX - self.next_rank
    }

    /// Backlog items in ascending rank order
    pub fn backlog_in_order(&self) -> Vec<&Item> {
        self.backlog
            .iter()
            .filter_map(|id| self.items.get(id))
            .collect()
    }

    pub fn backlog_ids(&self) -> &[ItemId] {
        &self.backlog
    }

    pub(crate) fn backlog_mut(&mut self) -> &mut Vec<ItemId> {
        &mut self.backlog
    }
}

fn id_prefix_dash() -> String {
    format!("{}-", ITEM_ID_PREFIX)
}

/// First rank available to items added after an import whose highest rank
/// was `existing_max_rank`. `None` once ranks are used up.
pub fn next_rank_after_import(existing_max_rank: Rank) -> Option<Rank> {
    existing_max_rank.checked_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_increasing_ranks_and_fresh_ids() {
        let mut ledger = Ledger::new();
        let a = ledger.create("ROLES", true).id.clone();
        let b = ledger.create("a", false).id.clone();
        let c = ledger.create("b", false).id.clone();

        assert_eq!(a.as_str(), "I-001");
        assert_eq!(b.as_str(), "I-002");
        assert_eq!(c.as_str(), "I-003");
        let ranks: Vec<Rank> = ledger.iter().map(|i| i.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert_eq!(ledger.max_rank(), Some(2));
    }

    #[test]
    fn test_new_items_start_in_backlog() {
        let mut ledger = Ledger::new();
        ledger.create("H", true);
        ledger.create("x", false);
        let backlog = ledger.backlog_in_order();
        assert_eq!(backlog.len(), 2);
        assert!(backlog.iter().all(|i| i.in_backlog()));
        assert!(backlog[0].is_category_header);
    }

    #[test]
    fn test_restore_preserves_rank_and_continues_after_it() {
        let mut ledger = Ledger::new();
        ledger
            .restore(Item::new("I-010".into(), 7, "late".into(), false))
            .unwrap();
        ledger
            .restore(Item::new("I-002".into(), 0, "H".into(), true))
            .unwrap();
        ledger.sort_by_rank();

        let ids: Vec<&str> = ledger.backlog_ids().iter().map(|i| i.as_str()).collect();
        assert_eq!(ids, vec!["I-002", "I-010"]);

        let next = ledger.create("new", false);
        assert_eq!(next.rank, 8);
        assert_eq!(next.id.as_str(), "I-011");
    }

    #[test]
    fn test_restore_rejects_duplicate_id() {
        let mut ledger = Ledger::new();
        ledger
            .restore(Item::new("x".into(), 1, "a".into(), false))
            .unwrap();
        let err = ledger
            .restore(Item::new("x".into(), 2, "b".into(), false))
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateId(id) if id.as_str() == "x"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_restore_rejects_duplicate_rank() {
        let mut ledger = Ledger::new();
        ledger
            .restore(Item::new("x".into(), 1, "a".into(), false))
            .unwrap();
        let err = ledger
            .restore(Item::new("y".into(), 1, "b".into(), false))
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateRank { rank: 1, .. }));
    }

    #[test]
    fn test_rank_zero_is_a_real_rank() {
        let mut ledger = Ledger::new();
        ledger
            .restore(Item::new("h".into(), 0, "H".into(), true))
            .unwrap();
        // a second rank-0 item collides rather than being treated as unset
        assert!(
            ledger
                .restore(Item::new("i".into(), 0, "x".into(), false))
                .is_err()
        );
        assert_eq!(ledger.create("next", false).rank, 1);
    }

    #[test]
    fn test_next_rank_after_import_is_successor() {
        assert_eq!(next_rank_after_import(7), Some(8));
        assert_eq!(next_rank_after_import(0), Some(1));
        assert_eq!(next_rank_after_import(Rank::MAX), None);
    }

    #[test]
    fn test_restore_rejects_largest_rank() {
        let mut ledger = Ledger::new();
        let err = ledger
            .restore(Item::new("x".into(), Rank::MAX, "x".into(), false))
            .unwrap_err();
        assert!(matches!(err, LedgerError::RankExhausted { rank: Rank::MAX, .. }));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_ranks_left_counts_down_to_zero() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.ranks_left(), Rank::MAX);
        ledger
            .restore(Item::new("h".into(), Rank::MAX - 2, "H".into(), true))
            .unwrap();
        assert_eq!(ledger.ranks_left(), 1);
        assert_eq!(ledger.create("last", false).rank, Rank::MAX - 1);
        assert_eq!(ledger.ranks_left(), 0);
    }
}
