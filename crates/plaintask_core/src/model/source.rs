//! Registered flat-file source.
//!
//! # Invariants
//! - `slug` is derived once from the title at registration time.

use crate::model::resource::{Resource, ResourceId, ResourcePatch};
use serde::{Deserialize, Serialize};

/// A project file the user has registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "_id", default)]
    pub id: ResourceId,
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

impl Source {
    /// Creates an unsaved source with a slug derived from `title`.
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            slug: slugify(&title),
            title,
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Lowercases `title` and collapses every non-alphanumeric run into `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

impl Resource for Source {
    type Patch = SourcePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: SourcePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(path) = patch.path {
            self.path = path;
        }
        if let Some(slug) = patch.slug {
            self.slug = slug;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(selected) = patch.selected {
            self.selected = Some(selected);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePatch {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

impl ResourcePatch for SourcePatch {
    fn target_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_target_id(&mut self, id: ResourceId) {
        self.id = Some(id);
    }
}
