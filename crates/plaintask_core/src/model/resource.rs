//! Identity and patch contracts shared by every stored record.
//!
//! # Responsibility
//! - Define the minimal shape (`id`) every store operates on.
//! - Define shallow-merge patch semantics used by collection updates.
//!
//! # Invariants
//! - An empty id means "not assigned yet"; stores assign a UUID v4 on create.
//! - `apply_patch` must leave the id untouched; collection helpers restore it
//!   if an implementation does not.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Stable string identifier carried by every resource.
///
/// Kept as `String` rather than `Uuid` so containers written by other tools
/// (or hand-edited) still load.
pub type ResourceId = String;

/// A record that can live in a store.
pub trait Resource: Clone + Serialize {
    /// Partial update shape for this resource.
    type Patch: ResourcePatch;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: ResourceId);

    /// Shallow-merges every field present in `patch` into `self`.
    fn apply_patch(&mut self, patch: Self::Patch);

    /// Returns whether an identifier has been assigned.
    fn has_id(&self) -> bool {
        !self.id().trim().is_empty()
    }
}

/// Partial update addressed to one resource.
pub trait ResourcePatch {
    /// Identifier this patch targets, when it carries one.
    fn target_id(&self) -> Option<&str>;

    fn set_target_id(&mut self, id: ResourceId);
}

/// Generates a fresh resource identifier.
pub fn new_resource_id() -> ResourceId {
    Uuid::new_v4().to_string()
}

/// Distinguishes an absent field from an explicit `null` in patch payloads.
///
/// Used with `#[serde(default, deserialize_with = "deserialize_present")]` on
/// `Option<Option<T>>` fields: absent -> `None`, `null` -> `Some(None)`.
pub(crate) fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
