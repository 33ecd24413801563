//! Field extraction and serialization for one project record.
//!
//! # Responsibility
//! - Turn one delimited block into a [`TextProject`].
//! - Turn a [`TextProject`] back into the exact text the parser accepts.
//!
//! # Invariants
//! - A block without a trailing identifier marker, or with an empty title,
//!   yields no record.
//! - `parse_block(serialize_record(r))` reproduces every field of a
//!   well-formed `r` except `raw_project`.

use crate::grammar::delimit::delimit;
use crate::grammar::{id_marker, END_SENTINEL};
use crate::model::text_project::{TextProject, TAG_MARKER};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static TRAILING_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<!--ID: ([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})-->$",
    )
    .expect("valid trailing id regex")
});
static ACTION_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]+-").expect("valid action line regex"));
static DASH_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*-").expect("valid dash line regex"));

/// Parses one delimited block.
///
/// Returns `None` when the block has no trailing identifier marker or its
/// title is blank.
pub fn parse_block(block: &str) -> Option<TextProject> {
    let trimmed = block.trim_end();
    let captures = TRAILING_ID_RE.captures(trimmed)?;
    let marker = captures.get(0)?;
    let id = captures.get(1)?.as_str().to_string();

    let content = &trimmed[..marker.start()];
    let lines: Vec<&str> = content.lines().collect();

    let title = lines.first()?.trim();
    if title.is_empty() {
        return None;
    }

    // The tags line is the last non-blank line above the marker (or the
    // partial line the marker closes), never the title itself.
    let last_filled = lines.iter().rposition(|line| !line.trim().is_empty())?;
    let tags_index = (last_filled > 0 && lines[last_filled].starts_with(TAG_MARKER))
        .then_some(last_filled);
    let tags: Vec<String> = tags_index
        .map(|index| {
            lines[index]
                .split_whitespace()
                .filter(|token| token.starts_with(TAG_MARKER))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let body_end = tags_index.unwrap_or(lines.len());
    let actions: Vec<String> = lines[1..body_end]
        .iter()
        .filter(|line| ACTION_LINE_RE.is_match(line))
        .map(|line| line.trim().to_string())
        .collect();

    let mut body_start = 1;
    while body_start < body_end && DASH_LINE_RE.is_match(lines[body_start]) {
        body_start += 1;
    }
    let description = lines[body_start..body_end].join("\n").trim().to_string();

    Some(TextProject {
        id,
        raw_project: block.to_string(),
        title: title.to_string(),
        actions,
        description,
        tags,
    })
}

/// Parses every record of an already-normalized file.
///
/// Blocks that fail to parse are dropped; the file may hold half-typed text.
pub fn parse_text(text: &str) -> Vec<TextProject> {
    let spans = delimit(text);
    let total = spans.len();
    let records: Vec<TextProject> = spans
        .into_iter()
        .filter_map(|span| parse_block(span.slice(text)))
        .collect();
    if records.len() < total {
        debug!(
            "event=grammar_parse module=grammar status=partial blocks={} records={}",
            total,
            records.len()
        );
    }
    records
}

/// Serializes one record.
///
/// Layout: title, tab-indented actions, blank line + description, blank line
/// + tags line, identifier marker. Empty sections are omitted.
pub fn serialize_record(record: &TextProject) -> String {
    let mut out = String::from(record.title.as_str());
    for action in &record.actions {
        out.push_str("\n\t");
        out.push_str(action);
    }
    if !record.description.is_empty() {
        out.push_str("\n\n");
        out.push_str(&record.description);
    }
    out.push_str("\n\n");
    if !record.tags.is_empty() {
        out.push_str(&record.tags.join(" "));
        out.push('\n');
    }
    out.push_str(&id_marker(&record.id));
    out
}

/// Serializes a whole file: records separated by a blank line, then the
/// end sentinel on its own line.
pub fn serialize_records<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a TextProject>,
{
    let body = records
        .into_iter()
        .map(serialize_record)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{body}\n{END_SENTINEL}")
}

#[cfg(test)]
mod tests {
    use super::{parse_block, parse_text, serialize_record, serialize_records};
    use crate::model::text_project::TextProject;

    const ID: &str = "123e4567-e89b-12d3-a456-426614174000";

    #[test]
    fn parses_title_tags_and_id() {
        let block = format!("- Buy milk\n\n#errand\n<!--ID: {ID}-->");
        let record = parse_block(&block).expect("block should parse");
        assert_eq!(record.id, ID);
        assert_eq!(record.title, "- Buy milk");
        assert_eq!(record.tags, vec!["#errand".to_string()]);
        assert!(record.actions.is_empty());
        assert_eq!(record.description, "");
        assert_eq!(record.raw_project, block);
    }

    #[test]
    fn parses_actions_and_description() {
        let block = format!(
            "- Title\n\t- Task 1\n  - Task 2\n\nAdditional description.\nSecond line.\n\n#tag1 #tag2\n<!--ID: {ID}-->"
        );
        let record = parse_block(&block).expect("block should parse");
        assert_eq!(record.actions, vec!["- Task 1", "- Task 2"]);
        assert_eq!(record.description, "Additional description.\nSecond line.");
        assert_eq!(record.tags, vec!["#tag1", "#tag2"]);
    }

    #[test]
    fn missing_id_yields_none() {
        assert!(parse_block("- No identifier\n").is_none());
    }

    #[test]
    fn blank_title_yields_none() {
        assert!(parse_block(&format!("   \n<!--ID: {ID}-->")).is_none());
    }

    #[test]
    fn heading_inside_description_is_not_a_tag_line() {
        let block = format!("- Title\n\nIntro\n#not-tags here\n\n#real\n<!--ID: {ID}-->");
        let record = parse_block(&block).expect("block should parse");
        assert_eq!(record.tags, vec!["#real"]);
        assert_eq!(record.description, "Intro\n#not-tags here");
    }

    #[test]
    fn tags_line_may_be_followed_by_a_blank_line() {
        let block = format!("- Buy milk\n\n#errand\n\n<!--ID: {ID}-->");
        let record = parse_block(&block).expect("block should parse");
        assert_eq!(record.tags, vec!["#errand"]);
        assert_eq!(record.description, "");
    }

    #[test]
    fn tags_line_filters_non_tag_tokens() {
        let block = format!("- Title\n#a b #c\n<!--ID: {ID}-->");
        let record = parse_block(&block).expect("block should parse");
        assert_eq!(record.tags, vec!["#a", "#c"]);
    }

    #[test]
    fn inline_marker_is_not_part_of_the_title() {
        let block = format!("- Title <!--ID: {ID}-->");
        let record = parse_block(&block).expect("block should parse");
        assert_eq!(record.title, "- Title");
    }

    #[test]
    fn serialize_omits_empty_sections() {
        let mut record = TextProject::new("- Bare");
        record.id = ID.to_string();
        assert_eq!(serialize_record(&record), format!("- Bare\n\n<!--ID: {ID}-->"));
    }

    #[test]
    fn serialize_full_layout() {
        let record = TextProject {
            id: ID.to_string(),
            raw_project: String::new(),
            title: "- Title".to_string(),
            actions: vec!["- a".to_string(), "- b".to_string()],
            description: "Body".to_string(),
            tags: vec!["#x".to_string(), "#y".to_string()],
        };
        assert_eq!(
            serialize_record(&record),
            format!("- Title\n\t- a\n\t- b\n\nBody\n\n#x #y\n<!--ID: {ID}-->")
        );
    }

    #[test]
    fn serialize_records_joins_and_terminates() {
        assert_eq!(serialize_records(std::iter::empty()), "\n<<END>>");

        let mut record = TextProject::new("- One");
        record.id = ID.to_string();
        let text = serialize_records(&[record.clone()]);
        assert!(text.ends_with("-->\n<<END>>"));

        let parsed = parse_text(&text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "- One");
    }
}
