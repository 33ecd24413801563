//! Flat-file representable project record.
//!
//! # Responsibility
//! - Hold the subset of a project that the text grammar can express.
//! - Provide the patch shape used when content fields are edited.
//!
//! # Invariants
//! - `title` is one line that keeps its leading `- ` marker.
//! - `actions` are stored trimmed, each starting with `-`.
//! - `tags` keep file order; duplicates are not removed at this layer.

use crate::grammar::{END_SENTINEL, ID_MARKER_PREFIX};
use crate::model::resource::{Resource, ResourceId, ResourcePatch};
use serde::{Deserialize, Serialize};

/// Line prefix that opens every record in the flat file.
pub const TITLE_MARKER: &str = "- ";
/// First character of every tag token.
pub const TAG_MARKER: char = '#';

/// One project as it appears in the flat file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProject {
    #[serde(rename = "_id", default)]
    pub id: ResourceId,
    /// Text span this record was parsed from. Diagnostic only.
    #[serde(default)]
    pub raw_project: String,
    pub title: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TextProject {
    /// Creates an unsaved record with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Returns whether serializing this record yields text the grammar reads
    /// back as the same record.
    ///
    /// Rules:
    /// - title is a single line starting with `- ` and non-empty after trim;
    /// - actions are single trimmed lines starting with `-`;
    /// - description lines never start a new record (`-` at column 0) and
    ///   never look like an action; without tags, the last one must not
    ///   start with `#`;
    /// - tags are whitespace-free tokens starting with `#`;
    /// - no field contains the end sentinel or an identifier marker.
    pub fn is_well_formed(&self) -> bool {
        let title_ok = self.title.starts_with(TITLE_MARKER)
            && !self.title.trim().is_empty()
            && !self.title.contains('\n')
            && self.title.trim() == self.title
            && !breaks_delimiting(&self.title);

        let actions_ok = self.actions.iter().all(|action| {
            action.starts_with('-')
                && !action.contains('\n')
                && action.trim() == action
                && !breaks_delimiting(action)
        });

        let description_ok = self.description.trim() == self.description
            && !breaks_delimiting(&self.description)
            && self
                .description
                .lines()
                .all(|line| !line.trim_start().starts_with('-'))
            && (!self.tags.is_empty()
                || !self
                    .description
                    .lines()
                    .last()
                    .is_some_and(|line| line.starts_with(TAG_MARKER)));

        let tags_ok = self.tags.iter().all(|tag| {
            tag.starts_with(TAG_MARKER)
                && !tag.chars().any(char::is_whitespace)
                && !breaks_delimiting(tag)
        });

        title_ok && actions_ok && description_ok && tags_ok
    }
}

/// Text that would end a record early or split it in two.
fn breaks_delimiting(text: &str) -> bool {
    text.contains(END_SENTINEL) || text.contains(ID_MARKER_PREFIX)
}

impl Resource for TextProject {
    type Patch = TextProjectPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: TextProjectPatch) {
        if let Some(raw_project) = patch.raw_project {
            self.raw_project = raw_project;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(actions) = patch.actions {
            self.actions = actions;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
    }
}

/// Partial update for [`TextProject`]. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProjectPatch {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ResourcePatch for TextProjectPatch {
    fn target_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_target_id(&mut self, id: ResourceId) {
        self.id = Some(id);
    }
}

impl From<TextProject> for TextProjectPatch {
    fn from(value: TextProject) -> Self {
        Self {
            id: Some(value.id),
            raw_project: Some(value.raw_project),
            title: Some(value.title),
            actions: Some(value.actions),
            description: Some(value.description),
            tags: Some(value.tags),
        }
    }
}
