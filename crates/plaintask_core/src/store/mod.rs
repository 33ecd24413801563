//! Resource stores and the shared CRUD contract.
//!
//! # Responsibility
//! - Define the collaborator-facing CRUD surface (`ResourceStore`).
//! - Provide structured, flat-file and reconciling implementations.
//! - Own file I/O helpers shared by every backend.
//!
//! # Invariants
//! - I/O failures never escape the CRUD surface: reads degrade to empty,
//!   writes report failure as a zero count or empty result. Both are logged.
//! - Mutations that change nothing never write.
//! - Every write is temp file + rename.
//!
//! # See also
//! - `store::collection` for the pure CRUD primitives.

use crate::model::resource::{Resource, ResourceId, ResourcePatch};
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod collection;
pub mod json_store;
pub mod synced_store;
pub mod text_store;

pub use collection::Filter;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-internal failure. Only visible through the `*_resources` hooks.
#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    InvalidPath(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {}: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "invalid json container {}: {source}", path.display())
            }
            Self::InvalidPath(message) => write!(f, "invalid store path: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidPath(_) => None,
        }
    }
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io_failed",
            Self::Json { .. } => "json_invalid",
            Self::InvalidPath(_) => "invalid_path",
        }
    }
}

/// CRUD contract shared by every store.
///
/// Implementors provide the load/save hooks; the provided operations wrap
/// them with the degrade-and-log failure policy.
pub trait ResourceStore<T: Resource> {
    /// Short name used in log lines.
    fn label(&self) -> &str;

    /// Loads the full collection.
    fn load_resources(&self) -> StoreResult<Vec<T>>;

    /// Persists the full collection.
    fn save_resources(&self, resources: &[T]) -> StoreResult<()>;

    /// Runs one load -> mutate -> save cycle.
    ///
    /// `mutate` returns the new collection and the affected count; nothing is
    /// written when the count is zero. Returns `None` on any I/O failure.
    fn commit<F>(&self, op: &str, mutate: F) -> Option<(Vec<T>, usize)>
    where
        F: FnOnce(Vec<T>) -> (Vec<T>, usize),
    {
        let resources = match self.load_resources() {
            Ok(resources) => resources,
            Err(err) => {
                error!(
                    "event=store_{op} module=store status=error store={} stage=load error_code={} error={}",
                    self.label(),
                    err.code(),
                    err
                );
                return None;
            }
        };

        let (resources, affected) = mutate(resources);
        if affected == 0 {
            return Some((resources, 0));
        }

        if let Err(err) = self.save_resources(&resources) {
            error!(
                "event=store_{op} module=store status=error store={} stage=save error_code={} error={}",
                self.label(),
                err.code(),
                err
            );
            return None;
        }
        Some((resources, affected))
    }

    /// Returns every record matching `filter`, or all records.
    ///
    /// Load failures yield an empty list.
    fn read(&self, filter: Option<&Filter>) -> Vec<T> {
        match self.load_resources() {
            Ok(resources) => collection::find(resources, filter),
            Err(err) => {
                error!(
                    "event=store_read module=store status=error store={} error_code={} error={}",
                    self.label(),
                    err.code(),
                    err
                );
                Vec::new()
            }
        }
    }

    /// Appends `new` and returns the full updated collection.
    ///
    /// Records without an id get a fresh one. Returns an empty list when the
    /// write fails.
    fn create(&self, new: Vec<T>) -> Vec<T> {
        self.commit("create", |resources| collection::create(resources, new))
            .map(|(resources, _)| resources)
            .unwrap_or_default()
    }

    /// Shallow-merges `patch` into the record `id`. Returns 1 or 0.
    fn update(&self, id: &str, patch: T::Patch) -> usize {
        self.commit("update", |resources| {
            collection::update(resources, id, patch)
        })
        .map_or(0, |(_, affected)| affected)
    }

    /// Applies each patch to the record its `target_id` names.
    fn update_many(&self, patches: Vec<T::Patch>) -> usize {
        self.commit("update_many", |resources| {
            collection::update_many(resources, patches)
        })
        .map_or(0, |(_, affected)| affected)
    }

    /// Removes the record `id`. Returns 1 or 0.
    fn delete(&self, id: &str) -> usize {
        self.commit("delete", |resources| collection::delete(resources, id))
            .map_or(0, |(_, affected)| affected)
    }

    /// Removes every record whose id is listed.
    fn delete_many(&self, ids: &[ResourceId]) -> usize {
        self.commit("delete_many", |resources| {
            collection::delete_many(resources, ids)
        })
        .map_or(0, |(_, affected)| affected)
    }
}

/// Fills in missing ids so callers can refer to records before they land.
pub(crate) fn assign_missing_ids<T: Resource>(resources: &mut [T]) {
    for resource in resources.iter_mut().filter(|resource| !resource.has_id()) {
        resource.set_id(crate::model::resource::new_resource_id());
    }
}

/// Stamps `id` on a patch that carries none, or warns when it disagrees.
pub(crate) fn address_patch<P: ResourcePatch>(mut patch: P, id: &str) -> P {
    match patch.target_id() {
        Some(target) if target != id => {
            warn!(
                "event=patch_address module=store status=skip reason=id_change id={} requested={}",
                id, target
            );
            patch.set_target_id(id.to_string());
        }
        Some(_) => {}
        None => patch.set_target_id(id.to_string()),
    }
    patch
}

pub(crate) fn read_file(path: &Path) -> StoreResult<String> {
    fs::read_to_string(path).map_err(|err| StoreError::io(path, err))
}

/// Writes `contents` to a sibling temp file, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> StoreResult<()> {
    let tmp_path = temp_sibling(path);
    fs::write(&tmp_path, contents.as_bytes()).map_err(|err| StoreError::io(&tmp_path, err))?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::io(path, err));
    }
    Ok(())
}

pub(crate) fn ensure_dir(dir: &Path) -> StoreResult<()> {
    fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp.{}", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::{read_file, temp_sibling, write_atomic};
    use std::path::Path;

    #[test]
    fn temp_sibling_stays_in_the_same_directory() {
        let tmp = temp_sibling(Path::new("/data/projects.json"));
        assert_eq!(tmp.parent(), Some(Path::new("/data")));
        assert!(tmp
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("projects.json.tmp."));
    }

    #[test]
    fn write_atomic_replaces_contents_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(read_file(&path).unwrap(), "second");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
