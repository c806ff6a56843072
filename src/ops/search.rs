use std::ops::Range;

use regex::Regex;
use serde::Serialize;

use crate::model::item::{Item, ItemId};
use crate::model::registry::ContainerId;
use crate::model::session::Session;

/// Which field of an item matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Id,
    Text,
    /// Title of the box holding the item
    BoxTitle,
}

/// A search hit for one item field
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub item_id: ItemId,
    pub container: Option<ContainerId>,
    pub field: MatchField,
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

/// Search every item, in rank order. Headers are included so a category
/// can be found by its label.
pub fn search_items(session: &Session, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for item in session.ledger().iter() {
        search_item(session, re, item, &mut hits);
    }
    hits
}

fn search_item(session: &Session, re: &Regex, item: &Item, hits: &mut Vec<SearchHit>) {
    let mut push = |field, spans: Vec<Range<usize>>| {
        if !spans.is_empty() {
            hits.push(SearchHit {
                item_id: item.id.clone(),
                container: item.container().cloned(),
                field,
                spans,
            });
        }
    };

    push(MatchField::Id, find_matches(re, item.id.as_str()));
    push(MatchField::Text, find_matches(re, &item.text));
    if let Some(container) = item.container().and_then(|c| session.registry().get(c)) {
        push(MatchField::BoxTitle, find_matches(re, &container.title));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::BoxesConfig;
    use crate::ops::placement::move_to_container;
    use crate::parse::{load_text, parse_text};

    fn session() -> Session {
        load_text(
            &parse_text("ROLES\nadmin\neditor\n\nNEEDS\nfast login\n"),
            &BoxesConfig::default(),
        )
    }

    #[test]
    fn test_matches_item_text() {
        let s = session();
        let hits = search_items(&s, &Regex::new("(?i)log").unwrap());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_id.as_str(), "I-005");
        assert_eq!(hits[0].field, MatchField::Text);
        assert_eq!(hits[0].spans, vec![5..8]);
    }

    #[test]
    fn test_matches_header_label() {
        let s = session();
        let hits = search_items(&s, &Regex::new("^NEEDS$").unwrap());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_id.as_str(), "I-004");
    }

    #[test]
    fn test_matches_box_title_of_members() {
        let mut s = session();
        let b = s
            .registry_mut()
            .create(Some("People".into()), None)
            .id
            .clone();
        move_to_container(&mut s, &ItemId::from("I-002"), &b).unwrap();

        let hits = search_items(&s, &Regex::new("People").unwrap());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_id.as_str(), "I-002");
        assert_eq!(hits[0].field, MatchField::BoxTitle);
        assert_eq!(hits[0].container.as_ref(), Some(&b));
    }
}
