//! Structured project record and derived classifications.
//!
//! # Responsibility
//! - Extend [`TextProject`] with metadata the text grammar cannot express.
//! - Derive status/periodic classifications from the title.
//! - Summarize tag usage across a project list.
//!
//! # Invariants
//! - `order` is only assigned when a record is first seen; later text edits
//!   never change it.
//! - `periodic_data` and `done` are owned by the structured store.

use crate::model::resource::{deserialize_present, Resource, ResourceId, ResourcePatch};
use crate::model::text_project::{TextProject, TextProjectPatch};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static PERIODIC_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"- .*#periodic").expect("valid periodic title regex"));

/// Scheduling block persisted only by the structured store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicData {
    /// Next due time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<i64>,
    /// Recurrence period in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<i64>,
}

/// Canonical structured project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id", default)]
    pub id: ResourceId,
    #[serde(default)]
    pub raw_project: String,
    pub title: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Last completion time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<i64>,
    /// Manual sort position. Duplicates are tolerated.
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub periodic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodic_data: Option<PeriodicData>,
}

/// Progress classification derived from title checkbox markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectStatus {
    Pending,
    /// Title contains `[x]` or `[X]`.
    Done,
    /// Title contains `[?]`.
    Incubated,
}

impl Project {
    /// Builds a structured project from its text form.
    ///
    /// `periodic` is derived from the title; `done` and `periodic_data`
    /// start empty.
    pub fn from_text(text: TextProject, order: i64) -> Self {
        let periodic = is_periodic_title(&text.title);
        Self {
            id: text.id,
            raw_project: text.raw_project,
            title: text.title,
            actions: text.actions,
            description: text.description,
            tags: text.tags,
            done: None,
            order,
            periodic,
            periodic_data: None,
        }
    }

    /// Replaces content fields with the text form, keeping metadata.
    pub fn absorb_text(&mut self, text: &TextProject) {
        self.raw_project = text.raw_project.clone();
        self.title = text.title.clone();
        self.actions = text.actions.clone();
        self.description = text.description.clone();
        self.tags = text.tags.clone();
        self.periodic = is_periodic_title(&self.title);
    }

    pub fn status(&self) -> ProjectStatus {
        if self.title.contains("[x]") || self.title.contains("[X]") {
            ProjectStatus::Done
        } else if self.title.contains("[?]") {
            ProjectStatus::Incubated
        } else {
            ProjectStatus::Pending
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }
}

/// Returns whether a title marks its project as recurring.
pub fn is_periodic_title(title: &str) -> bool {
    PERIODIC_TITLE_RE.is_match(title)
}

/// Returns `max(order)` over `projects`, floored at zero.
pub fn last_order(projects: &[Project]) -> i64 {
    projects
        .iter()
        .map(|project| project.order)
        .fold(0, i64::max)
}

impl Resource for Project {
    type Patch = ProjectPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: ProjectPatch) {
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
        if let Some(done) = patch.done {
            self.done = done;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(periodic) = patch.periodic {
            self.periodic = periodic;
        }
        if let Some(periodic_data) = patch.periodic_data {
            self.periodic_data = periodic_data;
        }
    }
}

/// Partial update for [`Project`].
///
/// Nullable fields use `Option<Option<_>>`: absent leaves the value alone,
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
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
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub done: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodic: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub periodic_data: Option<Option<PeriodicData>>,
}

impl ProjectPatch {
    /// Returns whether the patch edits any field the flat file stores.
    pub fn touches_content(&self) -> bool {
        self.title.is_some()
            || self.actions.is_some()
            || self.description.is_some()
            || self.tags.is_some()
    }
}

impl ResourcePatch for ProjectPatch {
    fn target_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_target_id(&mut self, id: ResourceId) {
        self.id = Some(id);
    }
}

impl From<Project> for ProjectPatch {
    fn from(value: Project) -> Self {
        Self {
            id: Some(value.id),
            raw_project: Some(value.raw_project),
            title: Some(value.title),
            actions: Some(value.actions),
            description: Some(value.description),
            tags: Some(value.tags),
            done: Some(value.done),
            order: Some(value.order),
            periodic: Some(value.periodic),
            periodic_data: Some(value.periodic_data),
        }
    }
}

impl From<&Project> for TextProject {
    fn from(value: &Project) -> Self {
        Self {
            id: value.id.clone(),
            raw_project: value.raw_project.clone(),
            title: value.title.clone(),
            actions: value.actions.clone(),
            description: value.description.clone(),
            tags: value.tags.clone(),
        }
    }
}

impl From<&ProjectPatch> for TextProjectPatch {
    fn from(value: &ProjectPatch) -> Self {
        Self {
            id: value.id.clone(),
            raw_project: None,
            title: value.title.clone(),
            actions: value.actions.clone(),
            description: value.description.clone(),
            tags: value.tags.clone(),
        }
    }
}

/// Per-tag usage counts split by [`ProjectStatus`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCounts {
    pub pending: HashMap<String, usize>,
    pub done: HashMap<String, usize>,
    pub incubated: HashMap<String, usize>,
    pub overall: HashMap<String, usize>,
    /// Tags in first-seen order.
    first_seen: Vec<String>,
}

impl TagCounts {
    /// Counts every tag occurrence across `projects`.
    ///
    /// Every seen tag gets an entry (possibly zero) in all three status maps.
    pub fn from_projects(projects: &[Project]) -> Self {
        let mut counts = Self::default();
        for project in projects {
            let status = project.status();
            for tag in &project.tags {
                if !counts.overall.contains_key(tag) {
                    counts.first_seen.push(tag.clone());
                }
                *counts.overall.entry(tag.clone()).or_insert(0) += 1;
                let pending = counts.pending.entry(tag.clone()).or_insert(0);
                if status == ProjectStatus::Pending {
                    *pending += 1;
                }
                let done = counts.done.entry(tag.clone()).or_insert(0);
                if status == ProjectStatus::Done {
                    *done += 1;
                }
                let incubated = counts.incubated.entry(tag.clone()).or_insert(0);
                if status == ProjectStatus::Incubated {
                    *incubated += 1;
                }
            }
        }
        counts
    }

    /// Tags sorted by pending count, descending. Ties keep first-seen order.
    pub fn sorted_by_pending(&self) -> Vec<String> {
        let mut tags = self.first_seen.clone();
        tags.sort_by(|a, b| {
            let count_a = self.pending.get(a).copied().unwrap_or(0);
            let count_b = self.pending.get(b).copied().unwrap_or(0);
            count_b.cmp(&count_a)
        });
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::{is_periodic_title, last_order, Project, ProjectPatch, ProjectStatus, TagCounts};
    use crate::model::resource::Resource;
    use crate::model::text_project::TextProject;

    fn project(title: &str, tags: &[&str]) -> Project {
        let mut text = TextProject::new(title);
        text.tags = tags.iter().map(|tag| tag.to_string()).collect();
        Project::from_text(text, 0)
    }

    #[test]
    fn periodic_flag_follows_title() {
        assert!(is_periodic_title("- Water plants #periodic"));
        assert!(!is_periodic_title("- Water plants"));
        assert!(project("- Gym #periodic", &[]).periodic);
    }

    #[test]
    fn status_reads_checkbox_markers() {
        assert_eq!(project("- [x] shipped", &[]).status(), ProjectStatus::Done);
        assert_eq!(project("- [X] shipped", &[]).status(), ProjectStatus::Done);
        assert_eq!(project("- [?] maybe", &[]).status(), ProjectStatus::Incubated);
        assert_eq!(project("- todo", &[]).status(), ProjectStatus::Pending);
    }

    #[test]
    fn last_order_is_floored_at_zero() {
        assert_eq!(last_order(&[]), 0);
        let mut negative = project("- a", &[]);
        negative.order = -4;
        assert_eq!(last_order(&[negative]), 0);
    }

    #[test]
    fn patch_with_null_clears_done() {
        let mut target = project("- a", &[]);
        target.done = Some(10);

        let patch: ProjectPatch = serde_json::from_value(serde_json::json!({ "done": null }))
            .expect("patch should deserialize");
        assert_eq!(patch.done, Some(None));
        target.apply_patch(patch);
        assert_eq!(target.done, None);

        let untouched: ProjectPatch =
            serde_json::from_value(serde_json::json!({ "order": 3 })).expect("patch");
        assert_eq!(untouched.done, None);
    }

    #[test]
    fn tag_counts_split_by_status_and_sort_by_pending() {
        let projects = vec![
            project("- [x] done one", &["#home"]),
            project("- pending one", &["#work", "#home"]),
            project("- pending two", &["#work"]),
            project("- [?] idea", &["#someday"]),
        ];

        let counts = TagCounts::from_projects(&projects);
        assert_eq!(counts.overall["#home"], 2);
        assert_eq!(counts.done["#home"], 1);
        assert_eq!(counts.pending["#work"], 2);
        assert_eq!(counts.incubated["#someday"], 1);
        assert_eq!(counts.pending["#someday"], 0);
        assert_eq!(
            counts.sorted_by_pending(),
            vec!["#work".to_string(), "#home".to_string(), "#someday".to_string()]
        );
    }
}
