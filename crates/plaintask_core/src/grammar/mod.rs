//! Flat-file record grammar.
//!
//! # Responsibility
//! - Delimit records inside a whole file and give anonymous ones an id.
//! - Parse one record into fields and serialize it back.
//! - Expose the grammar to stores through [`RecordGrammar`].
//!
//! # Invariants
//! - Serializer output always carries an identifier marker and the file
//!   always ends with the `<<END>>` sentinel line.
//! - Normalization is idempotent.
//!
//! # Format
//! ```text
//! - Title
//! 	- action
//!
//! Description
//!
//! #tag1 #tag2
//! <!--ID: 123e4567-e89b-12d3-a456-426614174000-->
//!
//! - Next title
//! ...
//! <<END>>
//! ```

mod delimit;
mod record;

pub use delimit::{
    delimit, has_id_marker, normalize_block, normalize_text, NormalizedText, RecordSpan,
};
pub use record::{parse_block, parse_text, serialize_record, serialize_records};

use crate::model::resource::Resource;
use crate::model::text_project::TextProject;

/// Sentinel line that terminates the flat file.
pub const END_SENTINEL: &str = "<<END>>";
/// Opening of an identifier marker.
pub const ID_MARKER_PREFIX: &str = "<!--ID: ";
/// Closing of an identifier marker.
pub const ID_MARKER_SUFFIX: &str = "-->";

/// Formats the identifier marker for `id`.
pub fn id_marker(id: &str) -> String {
    format!("{ID_MARKER_PREFIX}{id}{ID_MARKER_SUFFIX}")
}

/// Text codec a [`crate::store::text_store::TextStore`] persists through.
pub trait RecordGrammar {
    type Record: Resource;

    /// Gives every anonymous record an identifier, in place.
    fn normalize(&self, text: &str) -> NormalizedText;

    /// Parses every well-formed record; malformed blocks are dropped.
    fn parse(&self, text: &str) -> Vec<Self::Record>;

    /// Serializes a full file.
    fn serialize(&self, records: &[Self::Record]) -> String;

    /// Returns whether `record` survives a serialize/parse cycle.
    fn accepts(&self, record: &Self::Record) -> bool;
}

/// Grammar of the projects file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectGrammar;

impl RecordGrammar for ProjectGrammar {
    type Record = TextProject;

    fn normalize(&self, text: &str) -> NormalizedText {
        normalize_text(text)
    }

    fn parse(&self, text: &str) -> Vec<TextProject> {
        parse_text(text)
    }

    fn serialize(&self, records: &[TextProject]) -> String {
        serialize_records(records)
    }

    fn accepts(&self, record: &TextProject) -> bool {
        record.is_well_formed()
    }
}
