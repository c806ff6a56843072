use std::fs;
use std::path::{Path, PathBuf};

use crate::io::recovery::{RecoveryCategory, RecoveryEntry, atomic_write, log_recovery};
use crate::model::config::Config;
use crate::model::session::Session;
use crate::ops::import::{ImportDecision, ImportError, ImportOutcome, import_contents};
use crate::parse::{CodecError, from_interchange, parse_interchange, serialize_boxes, serialize_session};

/// Error type for session file I/O
#[derive(Debug, thiserror::Error)]
pub enum SessionIoError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("session file {path} is not valid JSON: {source}")]
    NotStructured {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("session file {path} is broken: {source}")]
    Corrupt { path: PathBuf, source: CodecError },
    #[error("could not import {path}: {source}")]
    Import { path: PathBuf, source: ImportError },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

fn read(path: &Path) -> Result<String, SessionIoError> {
    fs::read_to_string(path).map_err(|e| SessionIoError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load the session stored at `path`. A missing file is an empty session.
///
/// The session file is always a structured document; anything else is
/// reported rather than silently read as delimited text.
pub fn load_session(path: &Path, config: &Config) -> Result<Session, SessionIoError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no session file, starting empty");
        return Ok(Session::new(config.boxes.clone()));
    }
    let text = read(path)?;
    let doc = parse_interchange(&text).map_err(|e| SessionIoError::NotStructured {
        path: path.to_path_buf(),
        source: e,
    })?;
    let session = from_interchange(&doc, &config.boxes).map_err(|e| SessionIoError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(
        path = %path.display(),
        items = session.ledger().len(),
        boxes = session.registry().len(),
        "session loaded"
    );
    Ok(session)
}

/// Write the session as a structured document. If the write fails the
/// document goes to the recovery log instead.
pub fn save_session(path: &Path, session: &Session) -> Result<(), SessionIoError> {
    let json = serialize_session(session)?;
    write_or_recover(path, &json)
}

/// Write the box contents as delimited text.
pub fn write_text_export(path: &Path, session: &Session) -> Result<(), SessionIoError> {
    write_or_recover(path, &serialize_boxes(session))
}

fn write_or_recover(path: &Path, content: &str) -> Result<(), SessionIoError> {
    match atomic_write(path, content.as_bytes()) {
        Ok(()) => {
            tracing::info!(path = %path.display(), bytes = content.len(), "wrote file");
            Ok(())
        }
        Err(e) => {
            log_recovery(
                path,
                RecoveryEntry::now(RecoveryCategory::Write, format!("could not write: {}", e))
                    .field("Target", path.display())
                    .body(content),
            );
            Err(SessionIoError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

/// Import the file at `source` into `session`, answering a conflict with
/// `decision`, or returning the conflict when there is none. A fatal import
/// error keeps the rejected contents in the recovery log beside
/// `session_path`.
pub fn import_file(
    session: &mut Session,
    session_path: &Path,
    source: &Path,
    decision: Option<ImportDecision>,
) -> Result<ImportOutcome, SessionIoError> {
    let contents = read(source)?;
    import_contents(session, &contents, decision).map_err(|e| {
        if e.is_fatal() {
            log_recovery(
                session_path,
                RecoveryEntry::now(RecoveryCategory::Import, e.to_string())
                    .field("Source", source.display())
                    .body(contents.as_str()),
            );
        }
        SessionIoError::Import {
            path: source.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::recovery::recovery_log_path;
    use crate::model::item::ItemId;
    use crate::ops::placement::move_to_container;
    use tempfile::TempDir;

    #[test]
    fn test_missing_session_is_empty() {
        let tmp = TempDir::new().unwrap();
        let session = load_session(&tmp.path().join("boxsort.json"), &Config::default()).unwrap();
        assert!(session.is_empty());
    }

    #[test]
    fn test_save_then_load_keeps_boxes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("boxsort.json");
        let cards = tmp.path().join("cards.txt");
        fs::write(&cards, "A\nx\ny\n").unwrap();

        let mut session = Session::new(Config::default().boxes);
        import_file(&mut session, &path, &cards, None).unwrap();
        let b = session.registry_mut().create(Some("Keep".into()), None).id.clone();
        move_to_container(&mut session, &ItemId::from("I-003"), &b).unwrap();
        save_session(&path, &session).unwrap();

        let reloaded = load_session(&path, &Config::default()).unwrap();
        assert_eq!(reloaded.registry().get(&b).unwrap().members(), &[ItemId::from("I-003")]);
        assert_eq!(reloaded.ledger().backlog_ids().len(), 2);
    }

    #[test]
    fn test_text_session_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("boxsort.json");
        fs::write(&path, "A\nx\n").unwrap();
        assert!(matches!(
            load_session(&path, &Config::default()),
            Err(SessionIoError::NotStructured { .. })
        ));
    }

    #[test]
    fn test_fatal_import_is_logged_for_recovery() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("boxsort.json");
        let broken = tmp.path().join("broken.json");
        fs::write(
            &broken,
            r#"{"sorted": [], "unsorted": {"H": {"rank": 0, "items": [{"text": "lost"}]}}}"#,
        )
        .unwrap();

        let mut session = Session::default();
        let err = import_file(&mut session, &path, &broken, Some(ImportDecision::Replace)).unwrap_err();
        assert!(matches!(err, SessionIoError::Import { .. }));
        assert!(session.is_empty());

        let log = fs::read_to_string(recovery_log_path(&path)).unwrap();
        assert!(log.contains("import: "));
        assert!(log.contains("\"text\": \"lost\""));
    }

    #[test]
    fn test_rejected_merge_is_not_logged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("boxsort.json");
        let first = tmp.path().join("a.txt");
        let second = tmp.path().join("b.txt");
        fs::write(&first, "A\nx\n").unwrap();
        fs::write(&second, "B\ny\n").unwrap();

        let mut session = Session::default();
        import_file(&mut session, &path, &first, None).unwrap();
        assert!(import_file(&mut session, &path, &second, Some(ImportDecision::Merge)).is_err());
        assert!(!recovery_log_path(&path).exists());
    }
}
