use crate::model::session::{ImportState, ImportTicket, Session};
use crate::ops::merge::{MergeError, MergeResult, merge_import_into_session};
use crate::parse::{CodecError, Incoming};

/// The user's answer when a file arrives while the session holds items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportDecision {
    /// Discard the current session and load the file
    Replace,
    /// Append the file's items to the current backlog
    Merge,
    /// Keep the session as it is
    Cancel,
}

/// What the user is asked about when an import meets a non-empty session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConflict {
    pub existing_items: usize,
    pub boxed_items: usize,
    pub incoming_items: usize,
    /// Only delimited text can be merged
    pub mergeable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The file replaced the (possibly empty) session
    Loaded { items: usize, containers: usize },
    /// The session holds items; call [`resolve_conflict`] with a decision
    Conflict(ImportConflict),
    Merged(MergeResult),
    Cancelled,
    /// A newer import was started before this one completed
    Superseded,
}

/// Error type for import operations
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("no import is waiting for this file")]
    NotPending,
    #[error("no import conflict to resolve")]
    NoConflict,
    #[error("could not load file: {0}")]
    Codec(#[from] CodecError),
    #[error("merge rejected: {0}")]
    Merge(#[from] MergeError),
}

impl ImportError {
    /// A fatal error means the file itself is broken; nothing was loaded.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ImportError::Codec(_))
    }
}

/// Start reading a file. Any earlier import, pending or waiting on a
/// conflict decision, is superseded.
pub fn begin_import(session: &mut Session) -> ImportTicket {
    session.last_ticket += 1;
    let ticket = ImportTicket(session.last_ticket);
    if !matches!(session.import, ImportState::Idle) {
        tracing::debug!(ticket = ticket.0, "new import supersedes the previous one");
    }
    session.import = ImportState::ImportPending { ticket };
    ticket
}

/// Deliver the contents read for `ticket`.
///
/// An empty session is loaded straight away. A non-empty one moves to
/// `ConflictPending` and the caller must [`resolve_conflict`]. A broken
/// structured document is rejected before either happens.
pub fn complete_import(
    session: &mut Session,
    ticket: ImportTicket,
    contents: &str,
) -> Result<ImportOutcome, ImportError> {
    if ticket.0 < session.last_ticket {
        tracing::debug!(ticket = ticket.0, latest = session.last_ticket, "dropping stale import");
        return Ok(ImportOutcome::Superseded);
    }
    if session.import != (ImportState::ImportPending { ticket }) {
        return Err(ImportError::NotPending);
    }

    let incoming = Incoming::detect(contents);
    let defaults = session.registry.defaults().clone();
    let loaded = match incoming.into_session(&defaults) {
        Ok(loaded) => loaded,
        Err(e) => {
            session.import = ImportState::Idle;
            return Err(e.into());
        }
    };

    if session.is_empty() {
        session.import = ImportState::Idle;
        return Ok(load(session, loaded));
    }

    let conflict = ImportConflict {
        existing_items: session.ledger.len(),
        boxed_items: session.boxed_count(),
        incoming_items: loaded.ledger.len(),
        mergeable: matches!(incoming, Incoming::Text(_)),
    };
    session.import = ImportState::ConflictPending {
        ticket,
        contents: contents.to_string(),
    };
    Ok(ImportOutcome::Conflict(conflict))
}

/// Apply the user's choice to a pending conflict. The session returns to
/// `Idle` whatever the outcome; a rejected merge leaves it untouched.
pub fn resolve_conflict(
    session: &mut Session,
    decision: ImportDecision,
) -> Result<ImportOutcome, ImportError> {
    let contents = match std::mem::take(&mut session.import) {
        ImportState::ConflictPending { contents, .. } => contents,
        other => {
            session.import = other;
            return Err(ImportError::NoConflict);
        }
    };

    match decision {
        ImportDecision::Cancel => Ok(ImportOutcome::Cancelled),
        ImportDecision::Replace => {
            let defaults = session.registry.defaults().clone();
            let loaded = Incoming::detect(&contents).into_session(&defaults)?;
            Ok(load(session, loaded))
        }
        ImportDecision::Merge => {
            let Incoming::Text(doc) = Incoming::detect(&contents) else {
                return Err(MergeError::NotDelimitedText.into());
            };
            match merge_import_into_session(session, &doc) {
                Ok(result) => Ok(ImportOutcome::Merged(result)),
                Err(e) => {
                    tracing::warn!(error = %e, "merge rejected");
                    Err(e.into())
                }
            }
        }
    }
}

/// Read a whole file into the session in one step, answering a conflict
/// with `decision`. Without a decision the conflict is left pending and
/// returned.
pub fn import_contents(
    session: &mut Session,
    contents: &str,
    decision: Option<ImportDecision>,
) -> Result<ImportOutcome, ImportError> {
    let ticket = begin_import(session);
    match (complete_import(session, ticket, contents)?, decision) {
        (ImportOutcome::Conflict(_), Some(decision)) => resolve_conflict(session, decision),
        (other, _) => Ok(other),
    }
}

fn load(session: &mut Session, loaded: Session) -> ImportOutcome {
    let outcome = ImportOutcome::Loaded {
        items: loaded.ledger.len(),
        containers: loaded.registry.len(),
    };
    session.replace_contents(loaded);
    tracing::debug!(?outcome, "session loaded");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::ItemId;
    use crate::ops::placement::move_to_container;
    use crate::parse::serialize_session;

    fn loaded(text: &str) -> Session {
        let mut session = Session::default();
        import_contents(&mut session, text, None).unwrap();
        session
    }

    fn texts(session: &Session) -> Vec<String> {
        session.ledger().iter().map(|i| i.text.clone()).collect()
    }

    #[test]
    fn test_empty_session_loads_without_conflict() {
        let mut session = Session::default();
        let ticket = begin_import(&mut session);
        assert_eq!(
            session.import_state(),
            &ImportState::ImportPending { ticket }
        );
        let outcome = complete_import(&mut session, ticket, "A\nx\n").unwrap();
        assert_eq!(
            outcome,
            ImportOutcome::Loaded {
                items: 2,
                containers: 0
            }
        );
        assert_eq!(session.import_state(), &ImportState::Idle);
    }

    #[test]
    fn test_non_empty_session_asks_first() {
        let mut session = loaded("A\nx\n");
        let ticket = begin_import(&mut session);
        let outcome = complete_import(&mut session, ticket, "A\ny\nz\n").unwrap();
        assert_eq!(
            outcome,
            ImportOutcome::Conflict(ImportConflict {
                existing_items: 2,
                boxed_items: 0,
                incoming_items: 3,
                mergeable: true,
            })
        );
        assert!(matches!(
            session.import_state(),
            ImportState::ConflictPending { .. }
        ));
        // nothing applied yet
        assert_eq!(texts(&session), vec!["A", "x"]);
    }

    #[test]
    fn test_cancel_leaves_session_untouched() {
        let mut session = loaded("A\nx\n");
        let ticket = begin_import(&mut session);
        complete_import(&mut session, ticket, "B\ny\n").unwrap();
        let outcome = resolve_conflict(&mut session, ImportDecision::Cancel).unwrap();
        assert_eq!(outcome, ImportOutcome::Cancelled);
        assert_eq!(texts(&session), vec!["A", "x"]);
        assert_eq!(session.import_state(), &ImportState::Idle);
    }

    #[test]
    fn test_replace_discards_everything() {
        let mut session = loaded("A\nx\n");
        let b = session.registry_mut().create(None, None).id.clone();
        move_to_container(&mut session, &ItemId::from("I-002"), &b).unwrap();

        let outcome = import_contents(&mut session, "B\ny\n", Some(ImportDecision::Replace)).unwrap();
        assert_eq!(
            outcome,
            ImportOutcome::Loaded {
                items: 2,
                containers: 0
            }
        );
        assert_eq!(texts(&session), vec!["B", "y"]);
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_merge_appends() {
        let mut session = loaded("A\nx\n");
        let outcome = import_contents(&mut session, "A\ny\n", Some(ImportDecision::Merge)).unwrap();
        assert!(matches!(outcome, ImportOutcome::Merged(ref r) if r.added.len() == 1));
        assert_eq!(texts(&session), vec!["A", "x", "y"]);
    }

    #[test]
    fn test_rejected_merge_is_not_fatal_and_changes_nothing() {
        let mut session = loaded("A\nx\n");
        let err = import_contents(&mut session, "B\ny\n", Some(ImportDecision::Merge)).unwrap_err();
        assert!(matches!(err, ImportError::Merge(MergeError::CategoryMismatch { .. })));
        assert!(!err.is_fatal());
        assert_eq!(texts(&session), vec!["A", "x"]);
        assert_eq!(session.import_state(), &ImportState::Idle);
    }

    #[test]
    fn test_structured_file_cannot_be_merged() {
        let mut session = loaded("A\nx\n");
        let json = serialize_session(&loaded("A\ny\n")).unwrap();
        let err = import_contents(&mut session, &json, Some(ImportDecision::Merge)).unwrap_err();
        assert!(matches!(err, ImportError::Merge(MergeError::NotDelimitedText)));
        assert_eq!(texts(&session), vec!["A", "x"]);
    }

    #[test]
    fn test_broken_structured_file_is_fatal_before_asking() {
        let mut session = loaded("A\nx\n");
        let dup = r#"{"sorted": [], "unsorted": {"H": {"id": "h", "rank": 0, "items": [
            {"id": "h", "text": "x", "rank": 1}]}}}"#;
        let ticket = begin_import(&mut session);
        let err = complete_import(&mut session, ticket, dup).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(session.import_state(), &ImportState::Idle);
        assert_eq!(texts(&session), vec!["A", "x"]);
    }

    #[test]
    fn test_broken_structured_file_into_empty_session_loads_nothing() {
        let mut session = Session::default();
        let dup = r#"{"sorted": [], "unsorted": {"H": {"rank": 0, "items": [
            {"id": "a", "text": "x", "rank": 1}, {"id": "a", "text": "y", "rank": 2}]}}}"#;
        assert!(import_contents(&mut session, dup, Some(ImportDecision::Replace)).is_err());
        assert!(session.is_empty());
    }

    #[test]
    fn test_no_decision_leaves_conflict_pending() {
        let mut session = loaded("A\nx\n");
        let outcome = import_contents(&mut session, "A\ny\n", None).unwrap();
        assert!(matches!(outcome, ImportOutcome::Conflict(ref c) if c.mergeable));
        assert!(matches!(
            session.import_state(),
            ImportState::ConflictPending { .. }
        ));
        assert_eq!(texts(&session), vec!["A", "x"]);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut session = Session::default();
        let first = begin_import(&mut session);
        let second = begin_import(&mut session);

        // the older read finishes last-but-one: dropped
        let outcome = complete_import(&mut session, first, "OLD\nx\n").unwrap();
        assert_eq!(outcome, ImportOutcome::Superseded);
        assert!(session.is_empty());

        complete_import(&mut session, second, "NEW\ny\n").unwrap();
        assert_eq!(texts(&session), vec!["NEW", "y"]);

        // and after the newer one completed, the old one is still dropped
        let outcome = complete_import(&mut session, first, "OLD\nx\n").unwrap();
        assert_eq!(outcome, ImportOutcome::Superseded);
        assert_eq!(texts(&session), vec!["NEW", "y"]);
    }

    #[test]
    fn test_new_import_supersedes_open_conflict() {
        let mut session = loaded("A\nx\n");
        let first = begin_import(&mut session);
        complete_import(&mut session, first, "B\ny\n").unwrap();
        begin_import(&mut session);
        assert!(matches!(
            resolve_conflict(&mut session, ImportDecision::Replace),
            Err(ImportError::NoConflict)
        ));
        assert_eq!(texts(&session), vec!["A", "x"]);
    }

    #[test]
    fn test_completion_without_begin_is_rejected() {
        let mut session = Session::default();
        let ticket = begin_import(&mut session);
        complete_import(&mut session, ticket, "A\n").unwrap();
        assert!(matches!(
            complete_import(&mut session, ticket, "A\n"),
            Err(ImportError::NotPending)
        ));
    }

    #[test]
    fn test_largest_rank_aborts_the_load() {
        let mut session = Session::default();
        let json = format!(
            r#"{{"sorted": [], "unsorted": {{"H": {{"id": "h", "rank": 0, "items": [
                {{"id": "x", "text": "x", "rank": {}}}]}}}}}}"#,
            u64::MAX
        );
        let err = import_contents(&mut session, &json, None).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("largest possible rank"));
        assert!(session.is_empty());
    }

    #[test]
    fn test_merge_into_session_without_free_ranks_is_rejected() {
        let mut session = Session::default();
        let json = format!(
            r#"{{"sorted": [], "unsorted": {{"H": {{"id": "h", "rank": {}, "items": []}}}}}}"#,
            u64::MAX - 1
        );
        import_contents(&mut session, &json, None).unwrap();

        let err = import_contents(&mut session, "H\nnew\n", Some(ImportDecision::Merge)).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Merge(MergeError::RanksExhausted { needed: 1, left: 0 })
        ));
        assert!(!err.is_fatal());
        assert_eq!(texts(&session), vec!["H"]);
    }
}
