//! Completion log entry for periodic projects.

use crate::model::resource::{Resource, ResourceId, ResourcePatch};
use serde::{Deserialize, Serialize};

/// One completion of a periodic project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneRecord {
    #[serde(rename = "_id", default)]
    pub id: ResourceId,
    pub project_id: ResourceId,
    /// Completion time in epoch milliseconds.
    pub date: i64,
}

impl DoneRecord {
    /// Creates an unsaved record; the store assigns its id.
    pub fn new(project_id: impl Into<ResourceId>, date: i64) -> Self {
        Self {
            id: ResourceId::new(),
            project_id: project_id.into(),
            date,
        }
    }
}

impl Resource for DoneRecord {
    type Patch = DoneRecordPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: DoneRecordPatch) {
        if let Some(project_id) = patch.project_id {
            self.project_id = project_id;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneRecordPatch {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
}

impl ResourcePatch for DoneRecordPatch {
    fn target_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_target_id(&mut self, id: ResourceId) {
        self.id = Some(id);
    }
}
