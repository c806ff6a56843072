use crate::model::config::BoxesConfig;
use crate::model::item::numbered;
use crate::model::ledger::Ledger;
use crate::model::registry::Registry;
use crate::model::session::Session;

/// One category of a delimited-text file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCategory {
    pub label: String,
    pub items: Vec<String>,
}

/// A parsed delimited-text file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextDocument {
    pub categories: Vec<TextCategory>,
}

impl TextDocument {
    /// Number of content items (headers excluded)
    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }
}

/// Parse a delimited-text list.
///
/// The first non-blank line is a category header. A blank line means the
/// next non-blank line starts a new category; runs of blank lines count
/// once. Every other line is an item of the current category.
pub fn parse_text(source: &str) -> TextDocument {
    let mut categories: Vec<TextCategory> = Vec::new();
    let mut next_is_header = true;

    for line in source.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            next_is_header = true;
            continue;
        }

        match categories.last_mut() {
            Some(current) if !next_is_header => current.items.push(line.to_string()),
            _ => {
                categories.push(TextCategory {
                    label: line.to_string(),
                    items: Vec::new(),
                });
                next_is_header = false;
            }
        }
    }

    TextDocument { categories }
}

/// Create headers and items in file order. Item numbering restarts at 1
/// under each header.
pub fn populate_ledger(doc: &TextDocument, ledger: &mut Ledger) {
    for category in &doc.categories {
        let header = ledger.create(category.label.clone(), true);
        header.displayed_text = Some(category.label.clone());
        for (i, text) in category.items.iter().enumerate() {
            let item = ledger.create(text.clone(), false);
            item.displayed_text = Some(numbered(i as u64 + 1, text));
        }
    }
}

/// Build a fresh session (no boxes) from a delimited-text file.
pub fn load_text(doc: &TextDocument, defaults: &BoxesConfig) -> Session {
    let mut ledger = Ledger::new();
    populate_ledger(doc, &mut ledger);
    Session::from_parts(ledger, Registry::new(defaults.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_headers_and_items() {
        let doc = parse_text("ROLES\na\nb\n\nNEEDS\nc\n");
        assert_eq!(
            doc.categories,
            vec![
                TextCategory {
                    label: "ROLES".into(),
                    items: vec!["a".into(), "b".into()],
                },
                TextCategory {
                    label: "NEEDS".into(),
                    items: vec!["c".into()],
                },
            ]
        );
        assert_eq!(doc.item_count(), 3);
    }

    #[test]
    fn test_first_line_is_header_without_blank() {
        let doc = parse_text("Only\nx");
        assert_eq!(doc.categories.len(), 1);
        assert_eq!(doc.categories[0].label, "Only");
        assert_eq!(doc.categories[0].items, vec!["x"]);
    }

    #[test]
    fn test_leading_and_repeated_blank_lines_collapse() {
        let doc = parse_text("\n\nA\n1\n\n\n\nB\n2\n3\n\n");
        let labels: Vec<&str> = doc.categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B"]);
        assert_eq!(doc.categories[1].items, vec!["2", "3"]);
    }

    #[test]
    fn test_whitespace_only_line_is_blank() {
        let doc = parse_text("A\n1\n   \nB\n");
        assert_eq!(doc.categories.len(), 2);
        assert!(doc.categories[1].items.is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let doc = parse_text("A\r\none\r\n\r\nB\r\ntwo\r\n");
        assert_eq!(doc.categories[0].items, vec!["one"]);
        assert_eq!(doc.categories[1].label, "B");
    }

    #[test]
    fn test_empty_input_has_no_categories() {
        assert!(parse_text("").categories.is_empty());
        assert!(parse_text("\n\n").categories.is_empty());
    }

    #[test]
    fn test_scenario_ranks_and_numbering() {
        let doc = parse_text("ROLES\na\nb\n\nNEEDS\nc\n");
        let session = load_text(&doc, &BoxesConfig::default());
        let rows: Vec<(u64, String, bool)> = session
            .ledger()
            .backlog_in_order()
            .iter()
            .map(|i| (i.rank, session.display_text(i), i.is_category_header))
            .collect();
        assert_eq!(
            rows,
            vec![
                (0, "ROLES".to_string(), true),
                (1, "1. a".to_string(), false),
                (2, "2. b".to_string(), false),
                (3, "NEEDS".to_string(), true),
                (4, "1. c".to_string(), false),
            ]
        );
        assert!(session.registry().is_empty());
    }
}
