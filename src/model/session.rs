use super::config::BoxesConfig;
use super::item::{Item, ItemId, Rank, numbered};
use super::ledger::Ledger;
use super::registry::Registry;

/// Ticket handed out when an import starts. Only the newest ticket's
/// completion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImportTicket(pub u64);

/// Where the session stands with respect to incoming files
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImportState {
    #[default]
    Idle,
    /// A file read was started and has not completed
    ImportPending { ticket: ImportTicket },
    /// A file arrived while the session held items; waiting for the
    /// replace / merge / cancel choice
    ConflictPending {
        ticket: ImportTicket,
        contents: String,
    },
}

/// One sorting session: the item ledger, the box registry and the import
/// state, passed explicitly to every operation.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub(crate) ledger: Ledger,
    pub(crate) registry: Registry,
    pub(crate) import: ImportState,
    pub(crate) last_ticket: u64,
}

/// A category as currently shown in the backlog
#[derive(Debug)]
pub struct BacklogCategory<'a> {
    pub header: &'a Item,
    pub items: Vec<&'a Item>,
}

impl Session {
    pub fn new(defaults: BoxesConfig) -> Self {
        Session {
            ledger: Ledger::new(),
            registry: Registry::new(defaults),
            import: ImportState::Idle,
            last_ticket: 0,
        }
    }

    /// Build a session from already-populated parts.
    pub fn from_parts(ledger: Ledger, registry: Registry) -> Self {
        Session {
            ledger,
            registry,
            import: ImportState::Idle,
            last_ticket: 0,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Box create/rename/reposition. Membership is changed only through
    /// `ops::placement`.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn import_state(&self) -> &ImportState {
        &self.import
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty() && self.registry.is_empty()
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.ledger.get(id)
    }

    /// Replace ledger and registry with freshly loaded ones, keeping the
    /// import counters.
    pub(crate) fn replace_contents(&mut self, loaded: Session) {
        self.ledger = loaded.ledger;
        self.registry = loaded.registry;
    }

    /// The header of the category an item belongs to: the header with the
    /// greatest rank not above the item's rank.
    pub fn category_of<'a>(&'a self, item: &'a Item) -> Option<&'a Item> {
        if item.is_category_header {
            return Some(item);
        }
        self.ledger
            .headers()
            .filter(|h| h.rank < item.rank)
            .max_by_key(|h| h.rank)
    }

    /// Displayed text, derived from the rank-based ordinal when the item
    /// carries none.
    pub fn display_text(&self, item: &Item) -> String {
        if let Some(ref shown) = item.displayed_text {
            return shown.clone();
        }
        if item.is_category_header {
            return item.text.clone();
        }
        match self.category_of(item) {
            Some(header) => numbered(item.rank - header.rank, &item.text),
            None => item.text.clone(),
        }
    }

    /// Backlog grouped under the headers, in rank order. Items ranked
    /// before the first header are not shown under any category.
    pub fn backlog_categories(&self) -> Vec<BacklogCategory<'_>> {
        let mut categories: Vec<BacklogCategory<'_>> = Vec::new();
        for item in self.ledger.backlog_in_order() {
            if item.is_category_header {
                categories.push(BacklogCategory {
                    header: item,
                    items: Vec::new(),
                });
            } else if let Some(current) = categories.last_mut() {
                current.items.push(item);
            }
        }
        categories
    }

    /// Highest rank across backlog and all boxes
    pub fn max_rank(&self) -> Option<Rank> {
        self.ledger.max_rank()
    }

    /// Number of items filed into boxes
    pub fn boxed_count(&self) -> usize {
        self.registry.iter().map(|c| c.len()).sum()
    }
}
