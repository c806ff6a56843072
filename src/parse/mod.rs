pub mod interchange;
pub mod text_parser;
pub mod text_serializer;

pub use interchange::{
    CodecError, InterchangeDoc, from_interchange, parse_interchange, serialize_session,
    to_interchange,
};
pub use text_parser::{TextDocument, load_text, parse_text, populate_ledger};
pub use text_serializer::serialize_boxes;

use crate::model::config::BoxesConfig;
use crate::model::session::Session;

/// Contents of an imported file, after format detection
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Structured(InterchangeDoc),
    Text(TextDocument),
}

impl Incoming {
    /// Anything that is not a structured session document is read as
    /// delimited text.
    pub fn detect(source: &str) -> Incoming {
        match parse_interchange(source) {
            Ok(doc) => Incoming::Structured(doc),
            Err(e) => {
                if source.trim_start().starts_with('{') {
                    tracing::warn!(error = %e, "malformed structured document, reading as delimited text");
                } else {
                    tracing::debug!("reading as delimited text");
                }
                Incoming::Text(parse_text(source))
            }
        }
    }

    /// Build a standalone session from the incoming file.
    pub fn into_session(&self, defaults: &BoxesConfig) -> Result<Session, CodecError> {
        match self {
            Incoming::Structured(doc) => from_interchange(doc, defaults),
            Incoming::Text(doc) => Ok(load_text(doc, defaults)),
        }
    }
}
