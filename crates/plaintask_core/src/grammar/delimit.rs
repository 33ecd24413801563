//! Record delimiting and identifier normalization over a whole file.
//!
//! # Responsibility
//! - Find every record span in one forward scan.
//! - Append a fresh identifier marker to spans that lack one, in place.
//!
//! # Invariants
//! - A record starts at a line beginning with `- ` and ends at the earliest
//!   of: the end of an identifier marker that closes its line, or (exclusive)
//!   the next line beginning with `-` or the `<<END>>` sentinel.
//! - A candidate that reaches end-of-input without a terminator is not a
//!   record, and neither is anything after it.
//! - Normalization never removes or reorders text outside appended markers.

use crate::grammar::{id_marker, END_SENTINEL, ID_MARKER_PREFIX};
use crate::model::resource::{new_resource_id, ResourceId};
use crate::model::text_project::TITLE_MARKER;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static ID_MARKER_AT_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<!--ID: [0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}-->")
        .expect("valid anchored id marker regex")
});
static ID_MARKER_ANYWHERE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--ID: [0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}-->")
        .expect("valid id marker regex")
});

/// Byte range of one record inside the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan {
    pub start: usize,
    pub end: usize,
}

impl RecordSpan {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Result of [`normalize_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    /// Identifiers appended by this pass, in file order.
    pub assigned: Vec<ResourceId>,
}

impl NormalizedText {
    pub fn changed(&self) -> bool {
        !self.assigned.is_empty()
    }
}

/// Returns every record span of `text`, in file order.
pub fn delimit(text: &str) -> Vec<RecordSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    while let Some(start) = next_record_start(text.as_bytes(), cursor) {
        match record_end(text, start) {
            Some(end) => {
                spans.push(RecordSpan { start, end });
                cursor = end;
            }
            // A later start would hit the same end-of-input, so stop here.
            None => break,
        }
    }
    spans
}

/// Returns whether `block` already carries an identifier marker.
pub fn has_id_marker(block: &str) -> bool {
    ID_MARKER_ANYWHERE_RE.is_match(block)
}

/// Appends a fresh identifier marker to `block` when it has none.
///
/// Trailing whitespace is dropped so the marker sits on its own line right
/// after the last content line. Applying this twice is the same as once.
pub fn normalize_block(block: &str) -> Cow<'_, str> {
    if has_id_marker(block) {
        return Cow::Borrowed(block);
    }
    Cow::Owned(append_marker(block, &new_resource_id()))
}

/// Applies [`normalize_block`] to every record of `text` in place.
///
/// The whitespace that followed each normalized block is kept after the new
/// marker so record separation and any non-record text survive unchanged.
pub fn normalize_text(text: &str) -> NormalizedText {
    let mut output = String::with_capacity(text.len());
    let mut assigned = Vec::new();
    let mut cursor = 0;

    for span in delimit(text) {
        output.push_str(&text[cursor..span.start]);
        let block = span.slice(text);
        if has_id_marker(block) {
            output.push_str(block);
        } else {
            let id = new_resource_id();
            output.push_str(&append_marker(block, &id));
            let trailing = &block[block.trim_end().len()..];
            if trailing.is_empty() && span.end < text.len() {
                output.push('\n');
            } else {
                output.push_str(trailing);
            }
            assigned.push(id);
        }
        cursor = span.end;
    }
    output.push_str(&text[cursor..]);

    NormalizedText {
        text: output,
        assigned,
    }
}

fn append_marker(block: &str, id: &str) -> String {
    format!("{}\n{}", block.trim_end(), id_marker(id))
}

fn next_record_start(bytes: &[u8], from: usize) -> Option<usize> {
    let marker = TITLE_MARKER.as_bytes();
    let mut pos = from;
    while pos < bytes.len() {
        if is_line_start(bytes, pos) && bytes[pos..].starts_with(marker) {
            return Some(pos);
        }
        // Jump to the next line start.
        match bytes[pos..].iter().position(|byte| *byte == b'\n') {
            Some(offset) => pos += offset + 1,
            None => return None,
        }
    }
    None
}

fn record_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut pos = start + TITLE_MARKER.len();
    while pos <= bytes.len() {
        if let Some(end) = id_marker_closing_line(text, pos) {
            return Some(end);
        }
        let rest = &bytes[pos..];
        if (is_line_start(bytes, pos) && rest.first() == Some(&b'-'))
            || rest.starts_with(END_SENTINEL.as_bytes())
        {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

/// Returns the end of an identifier marker starting at `pos`, if that marker
/// is the last thing on its line.
fn id_marker_closing_line(text: &str, pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if !bytes[pos..].starts_with(ID_MARKER_PREFIX.as_bytes()) {
        return None;
    }
    // `pos` sits on an ASCII `<`, so it is a char boundary.
    let found = ID_MARKER_AT_START_RE.find(&text[pos..])?;
    let end = pos + found.end();
    is_line_end(bytes, end).then_some(end)
}

fn is_line_start(bytes: &[u8], pos: usize) -> bool {
    pos == 0 || bytes[pos - 1] == b'\n'
}

fn is_line_end(bytes: &[u8], pos: usize) -> bool {
    pos == bytes.len() || bytes[pos] == b'\n' || bytes[pos] == b'\r'
}
