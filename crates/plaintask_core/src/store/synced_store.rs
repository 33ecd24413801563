//! Reconciling composite of a flat-file store and a structured store.
//!
//! # Responsibility
//! - Treat the flat file as the authority for which records exist and for
//!   their content fields.
//! - Treat the structured store as the authority for metadata the flat file
//!   cannot express.
//! - Merge both on every read through an injected [`Expand`] strategy.
//!
//! # Invariants
//! - After a successful read, the structured id set equals the flat-file id
//!   set.
//! - Metadata attached to an id survives any edit that keeps the id.
//! - A failed load never triggers a save.
//! - Content changes reach the flat file before the structured store, so an
//!   interrupted write loses metadata at worst, never content.

use crate::grammar::{ProjectGrammar, RecordGrammar};
use crate::model::resource::{Resource, ResourceId};
use crate::store::json_store::JsonStore;
use crate::store::text_store::TextStore;
use crate::store::{
    address_patch, assign_missing_ids, collection, ResourceStore, StoreError, StoreResult,
};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use std::collections::HashSet;

/// Builds structured records from flat-file candidates.
///
/// `existing` is the current structured snapshot, so implementations can
/// keep metadata for known ids and derive defaults (such as the next sort
/// position) for new ones.
pub trait Expand<U, T> {
    fn expand(&self, candidates: &[U], existing: &[T]) -> Vec<T>;
}

/// Composite store keeping a flat file and a structured collection in step.
#[derive(Debug, Clone)]
pub struct SyncedStore<T, E, G = ProjectGrammar> {
    text: TextStore<G>,
    structured: JsonStore<T>,
    expander: E,
}

/// Record counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: usize,
    pub updated: usize,
    pub created: usize,
    pub duplicates: usize,
}

impl<T, E, G> SyncedStore<T, E, G>
where
    G: RecordGrammar,
    T: Resource + DeserializeOwned,
    T::Patch: From<T>,
    E: Expand<G::Record, T>,
    G::Record: for<'a> From<&'a T>,
    <G::Record as Resource>::Patch: for<'a> From<&'a T::Patch>,
{
    pub fn new(text: TextStore<G>, structured: JsonStore<T>, expander: E) -> Self {
        Self {
            text,
            structured,
            expander,
        }
    }

    /// Flat-file side, for raw whole-text access.
    pub fn text_store(&self) -> &TextStore<G> {
        &self.text
    }

    pub fn structured_store(&self) -> &JsonStore<T> {
        &self.structured
    }

    /// Runs one reconciliation pass and returns the persisted result.
    pub fn reconcile(&self) -> StoreResult<Vec<T>> {
        self.reconcile_with_report().map(|(records, _)| records)
    }

    /// Like [`Self::reconcile`], also returning what changed.
    pub fn reconcile_with_report(&self) -> StoreResult<(Vec<T>, ReconcileReport)> {
        let candidates = self.text.load_resources()?;
        let structured = self.structured.load_resources()?;
        let mut report = ReconcileReport::default();

        let parsed = candidates.len();
        let mut seen = HashSet::new();
        let candidates: Vec<G::Record> = candidates
            .into_iter()
            .filter(|candidate| {
                let first = seen.insert(candidate.id().to_string());
                if !first {
                    warn!(
                        "event=sync_reconcile module=store status=skip reason=duplicate_id id={}",
                        candidate.id()
                    );
                }
                first
            })
            .collect();
        report.duplicates = parsed - candidates.len();

        let stale: Vec<ResourceId> = structured
            .iter()
            .filter(|record| !seen.contains(record.id()))
            .map(|record| record.id().to_string())
            .collect();
        let (structured, removed) = collection::delete_many(structured, &stale);
        report.removed = removed;

        let known: HashSet<String> = structured
            .iter()
            .map(|record| record.id().to_string())
            .collect();
        let (existing, fresh): (Vec<G::Record>, Vec<G::Record>) = candidates
            .into_iter()
            .partition(|candidate| known.contains(candidate.id()));

        let patches: Vec<T::Patch> = self
            .expander
            .expand(&existing, &structured)
            .into_iter()
            .map(Into::into)
            .collect();
        let (structured, updated) = collection::update_many(structured, patches);
        report.updated = updated;

        let expanded = self.expander.expand(&fresh, &structured);
        let (structured, created) = collection::create(structured, expanded);
        report.created = created;

        self.structured.save_resources(&structured)?;
        info!(
            "event=sync_reconcile module=store status=ok removed={} updated={} created={} duplicates={} total={}",
            report.removed,
            report.updated,
            report.created,
            report.duplicates,
            structured.len()
        );
        Ok((self.structured.load_resources()?, report))
    }

    /// Applies content fields of `patches` to the flat file.
    ///
    /// Returns `None` on I/O failure or when a patched record would no longer
    /// parse back; the file is left untouched in both cases.
    fn push_text_patches(&self, patches: &[T::Patch]) -> Option<usize> {
        let text_patches: Vec<<G::Record as Resource>::Patch> =
            patches.iter().map(Into::into).collect();
        let mut rejected = false;

        let outcome = self.text.commit("update_many", |records| {
            let before = records.clone();
            let (after, _) = collection::update_many(records, text_patches);
            let changed: Vec<&G::Record> = after
                .iter()
                .zip(&before)
                .filter(|(new, old)| serialized_differs(*new, *old))
                .map(|(new, _)| new)
                .collect();

            if let Some(record) = changed
                .iter()
                .find(|record| !self.text.grammar().accepts(record))
            {
                warn!(
                    "event=sync_update module=store status=skip reason=malformed_record id={}",
                    record.id()
                );
                rejected = true;
                return (before, 0);
            }
            let count = changed.len();
            (after, count)
        });

        match outcome {
            Some(_) if rejected => None,
            Some((_, count)) => Some(count),
            None => None,
        }
    }
}

impl<T, E, G> ResourceStore<T> for SyncedStore<T, E, G>
where
    G: RecordGrammar,
    T: Resource + DeserializeOwned,
    T::Patch: From<T>,
    E: Expand<G::Record, T>,
    G::Record: for<'a> From<&'a T>,
    <G::Record as Resource>::Patch: for<'a> From<&'a T::Patch>,
{
    fn label(&self) -> &str {
        "synced"
    }

    /// Reconciles, then returns the structured snapshot.
    fn load_resources(&self) -> StoreResult<Vec<T>> {
        self.reconcile()
    }

    fn save_resources(&self, resources: &[T]) -> StoreResult<()> {
        self.structured.save_resources(resources)
    }

    /// Appends records to the flat file, then to the structured store.
    ///
    /// Ids already present are skipped. If the structured write fails the
    /// flat-file append is undone and an empty list is returned.
    fn create(&self, new: Vec<T>) -> Vec<T> {
        let structured = match self.reconcile() {
            Ok(structured) => structured,
            Err(err) => {
                log_failure("create", &err);
                return Vec::new();
            }
        };
        if new.is_empty() {
            return structured;
        }

        let known: HashSet<&str> = structured.iter().map(|record| record.id()).collect();
        let mut new: Vec<T> = new
            .into_iter()
            .filter(|record| {
                let fresh = !known.contains(record.id());
                if !fresh {
                    warn!(
                        "event=sync_create module=store status=skip reason=duplicate_id id={}",
                        record.id()
                    );
                }
                fresh
            })
            .collect();
        if new.is_empty() {
            return structured;
        }
        assign_missing_ids(&mut new);
        let ids: Vec<ResourceId> = new.iter().map(|record| record.id().to_string()).collect();

        let text_records: Vec<G::Record> = new.iter().map(Into::into).collect();
        if self.text.create(text_records).is_empty() {
            return Vec::new();
        }

        let (structured, created) = collection::create(structured, new);
        if let Err(err) = self.structured.save_resources(&structured) {
            log_failure("create", &err);
            let undone = self.text.delete_many(&ids);
            warn!(
                "event=sync_create module=store status=rollback requested={} undone={}",
                ids.len(),
                undone
            );
            return Vec::new();
        }
        info!(
            "event=sync_create module=store status=ok created={} total={}",
            created,
            structured.len()
        );
        structured
    }

    fn update(&self, id: &str, patch: T::Patch) -> usize {
        self.update_many(vec![address_patch(patch, id)])
    }

    /// Applies patches to the reconciled snapshot and pushes content fields
    /// to the flat file.
    fn update_many(&self, patches: Vec<T::Patch>) -> usize {
        let structured = match self.reconcile() {
            Ok(structured) => structured,
            Err(err) => {
                log_failure("update_many", &err);
                return 0;
            }
        };

        if self.push_text_patches(&patches).is_none() {
            return 0;
        }

        let (structured, affected) = collection::update_many(structured, patches);
        if affected == 0 {
            return 0;
        }
        if let Err(err) = self.structured.save_resources(&structured) {
            log_failure("update_many", &err);
            return 0;
        }
        affected
    }

    fn delete(&self, id: &str) -> usize {
        self.delete_many(&[id.to_string()])
    }

    /// Removes records from the flat file first, then from the structured
    /// store.
    ///
    /// A failed structured write is only logged: the next read drops the
    /// orphaned entries.
    fn delete_many(&self, ids: &[ResourceId]) -> usize {
        let structured = match self.reconcile() {
            Ok(structured) => structured,
            Err(err) => {
                log_failure("delete_many", &err);
                return 0;
            }
        };
        let (structured, removed) = collection::delete_many(structured, ids);
        if removed == 0 {
            return 0;
        }

        let text_removed = self
            .text
            .commit("delete_many", |records| collection::delete_many(records, ids));
        if text_removed.is_none() {
            return 0;
        }

        if let Err(err) = self.structured.save_resources(&structured) {
            warn!(
                "event=sync_delete module=store status=deferred error_code={} error={}",
                err.code(),
                err
            );
        }
        removed
    }
}

fn serialized_differs<R: Resource>(left: &R, right: &R) -> bool {
    serde_json::to_value(left).ok() != serde_json::to_value(right).ok()
}

fn log_failure(op: &str, err: &StoreError) {
    error!(
        "event=sync_{op} module=store status=error error_code={} error={}",
        err.code(),
        err
    );
}
