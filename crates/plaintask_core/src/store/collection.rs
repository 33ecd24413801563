//! Pure CRUD primitives over an in-memory ordered collection.
//!
//! # Responsibility
//! - Implement find/create/update/delete without touching any storage.
//! - Report how many records each mutation affected.
//!
//! # Invariants
//! - Input order is preserved; created records are appended in input order.
//! - Record ids never change through `update`.
//! - Inputs are consumed and a new collection is returned; nothing is
//!   mutated behind the caller's back.

use crate::model::resource::{new_resource_id, Resource, ResourceId, ResourcePatch};
use log::warn;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Field-name to value equality filter, evaluated on the serde form.
pub type Filter = Map<String, Value>;

/// Returns the records whose serialized fields equal every filter entry.
pub fn find<T: Resource>(resources: Vec<T>, filter: Option<&Filter>) -> Vec<T> {
    let Some(filter) = filter.filter(|filter| !filter.is_empty()) else {
        return resources;
    };
    resources
        .into_iter()
        .filter(|resource| matches_filter(resource, filter))
        .collect()
}

/// Appends `new`, assigning ids to records that lack one.
///
/// A record whose id already exists is skipped; the affected count covers
/// only appended records.
pub fn create<T: Resource>(mut resources: Vec<T>, new: Vec<T>) -> (Vec<T>, usize) {
    let mut known: HashSet<ResourceId> = resources
        .iter()
        .map(|resource| resource.id().to_string())
        .collect();
    let mut created = 0;

    for mut resource in new {
        if !resource.has_id() {
            resource.set_id(new_resource_id());
        }
        if !known.insert(resource.id().to_string()) {
            warn!(
                "event=collection_create module=store status=skip reason=duplicate_id id={}",
                resource.id()
            );
            continue;
        }
        resources.push(resource);
        created += 1;
    }
    (resources, created)
}

/// Shallow-merges `patch` into the record `id`.
///
/// An attempt to change the id is ignored with a warning; the rest of the
/// patch still applies.
pub fn update<T: Resource>(mut resources: Vec<T>, id: &str, patch: T::Patch) -> (Vec<T>, usize) {
    let Some(resource) = resources.iter_mut().find(|resource| resource.id() == id) else {
        return (resources, 0);
    };

    if let Some(target) = patch.target_id() {
        if target != id {
            warn!(
                "event=collection_update module=store status=skip reason=id_change id={} requested={}",
                id, target
            );
        }
    }

    let original_id = resource.id().to_string();
    resource.apply_patch(patch);
    if resource.id() != original_id {
        resource.set_id(original_id);
    }
    (resources, 1)
}

/// Applies each patch to the record named by its `target_id`, in order.
///
/// Patches without a target, or targeting an unknown id, change nothing.
pub fn update_many<T: Resource>(mut resources: Vec<T>, patches: Vec<T::Patch>) -> (Vec<T>, usize) {
    let mut total = 0;
    for patch in patches {
        let Some(id) = patch.target_id().map(str::to_string) else {
            warn!("event=collection_update_many module=store status=skip reason=missing_id");
            continue;
        };
        let (next, affected) = update(resources, &id, patch);
        resources = next;
        total += affected;
    }
    (resources, total)
}

/// Removes the record `id`.
pub fn delete<T: Resource>(resources: Vec<T>, id: &str) -> (Vec<T>, usize) {
    let before = resources.len();
    let kept: Vec<T> = resources
        .into_iter()
        .filter(|resource| resource.id() != id)
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Removes every record whose id appears in `ids`.
pub fn delete_many<T: Resource>(resources: Vec<T>, ids: &[ResourceId]) -> (Vec<T>, usize) {
    let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let before = resources.len();
    let kept: Vec<T> = resources
        .into_iter()
        .filter(|resource| !doomed.contains(resource.id()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

fn matches_filter<T: Resource>(resource: &T, filter: &Filter) -> bool {
    let Ok(Value::Object(fields)) = serde_json::to_value(resource) else {
        return false;
    };
    filter
        .iter()
        .all(|(key, expected)| fields.get(key) == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::{create, delete, delete_many, find, update, update_many, Filter};
    use crate::model::resource::Resource;
    use crate::model::source::{Source, SourcePatch};
    use serde_json::json;

    fn source(id: &str, title: &str) -> Source {
        let mut source = Source::new(title, format!("/tmp/{title}.md"));
        source.id = id.to_string();
        source
    }

    fn titles(resources: &[Source]) -> Vec<&str> {
        resources.iter().map(|source| source.title.as_str()).collect()
    }

    #[test]
    fn find_without_filter_returns_everything_in_order() {
        let all = vec![source("a", "one"), source("b", "two")];
        assert_eq!(titles(&find(all.clone(), None)), vec!["one", "two"]);
        assert_eq!(find(all, Some(&Filter::new())).len(), 2);
    }

    #[test]
    fn find_matches_on_serialized_field_names() {
        let all = vec![source("a", "one"), source("b", "two")];
        let mut filter = Filter::new();
        filter.insert("_id".to_string(), json!("b"));
        assert_eq!(titles(&find(all.clone(), Some(&filter))), vec!["two"]);

        filter.insert("title".to_string(), json!("one"));
        assert!(find(all, Some(&filter)).is_empty());
    }

    #[test]
    fn create_assigns_ids_and_appends_in_order() {
        let (resources, created) = create(
            vec![source("a", "one")],
            vec![source("", "two"), source("", "three")],
        );
        assert_eq!(created, 2);
        assert_eq!(titles(&resources), vec!["one", "two", "three"]);
        assert!(resources.iter().all(|resource| resource.has_id()));
        assert_ne!(resources[1].id, resources[2].id);
    }

    #[test]
    fn create_skips_duplicate_ids() {
        let (resources, created) = create(vec![source("a", "one")], vec![source("a", "clash")]);
        assert_eq!(created, 0);
        assert_eq!(titles(&resources), vec!["one"]);
    }

    #[test]
    fn update_merges_present_fields_and_keeps_id() {
        let patch = SourcePatch {
            id: Some("hijack".to_string()),
            title: Some("renamed".to_string()),
            ..SourcePatch::default()
        };
        let (resources, affected) = update(vec![source("a", "one")], "a", patch);
        assert_eq!(affected, 1);
        assert_eq!(resources[0].id, "a");
        assert_eq!(resources[0].title, "renamed");
        assert_eq!(resources[0].path, "/tmp/one.md");
    }

    #[test]
    fn update_unknown_id_is_a_no_op() {
        let (resources, affected) = update(
            vec![source("a", "one")],
            "missing",
            SourcePatch::default(),
        );
        assert_eq!(affected, 0);
        assert_eq!(titles(&resources), vec!["one"]);
    }

    #[test]
    fn update_many_uses_patch_targets() {
        let patches = vec![
            SourcePatch {
                id: Some("b".to_string()),
                title: Some("TWO".to_string()),
                ..SourcePatch::default()
            },
            SourcePatch {
                title: Some("untargeted".to_string()),
                ..SourcePatch::default()
            },
            SourcePatch {
                id: Some("zzz".to_string()),
                title: Some("ghost".to_string()),
                ..SourcePatch::default()
            },
        ];
        let (resources, affected) =
            update_many(vec![source("a", "one"), source("b", "two")], patches);
        assert_eq!(affected, 1);
        assert_eq!(titles(&resources), vec!["one", "TWO"]);
    }

    #[test]
    fn delete_and_delete_many_report_removed_counts() {
        let all = vec![source("a", "one"), source("b", "two"), source("c", "three")];

        let (rest, removed) = delete(all.clone(), "b");
        assert_eq!(removed, 1);
        assert_eq!(titles(&rest), vec!["one", "three"]);

        let (rest, removed) = delete_many(
            all,
            &["a".to_string(), "c".to_string(), "missing".to_string()],
        );
        assert_eq!(removed, 2);
        assert_eq!(titles(&rest), vec!["two"]);
    }
}
