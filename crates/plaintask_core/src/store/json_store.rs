//! Structured store: one compact JSON array per collection.
//!
//! # Responsibility
//! - Persist any `Resource` collection as `<dir>/<collection>.json`.
//!
//! # Invariants
//! - The container is always a JSON array; a missing or empty file reads
//!   as an empty collection.
//! - Unchanged content is never rewritten.

use crate::model::resource::Resource;
use crate::store::{ensure_dir, read_file, write_atomic, ResourceStore, StoreError, StoreResult};
use log::info;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// JSON-array backed store for `T`.
#[derive(Debug)]
pub struct JsonStore<T> {
    path: PathBuf,
    label: String,
    _records: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonStore<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            label: self.label.clone(),
            _records: PhantomData,
        }
    }
}

impl<T> JsonStore<T>
where
    T: Resource + DeserializeOwned,
{
    /// Opens `<dir>/<collection>.json`, creating the directory and an empty
    /// container when missing.
    ///
    /// # Errors
    /// - `InvalidPath` when `collection` is empty or contains a separator.
    /// - `Io` when the directory or container cannot be created.
    pub fn open(dir: impl AsRef<Path>, collection: &str) -> StoreResult<Self> {
        if collection.trim().is_empty()
            || collection.contains(|ch: char| ch == '/' || ch == '\\')
            || collection == "."
            || collection == ".."
        {
            return Err(StoreError::InvalidPath(format!(
                "collection name `{collection}` must be a plain file stem"
            )));
        }

        let dir = dir.as_ref();
        ensure_dir(dir)?;
        let path = dir.join(format!("{collection}.json"));
        if !path.exists() {
            write_atomic(&path, "[]")?;
            info!(
                "event=store_open module=store status=ok store=json collection={} created=true",
                collection
            );
        }

        Ok(Self {
            path,
            label: format!("json:{collection}"),
            _records: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_container(&self) -> StoreResult<Option<String>> {
        match read_file(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl<T> ResourceStore<T> for JsonStore<T>
where
    T: Resource + DeserializeOwned,
{
    fn label(&self) -> &str {
        &self.label
    }

    fn load_resources(&self) -> StoreResult<Vec<T>> {
        let Some(text) = self.read_container()? else {
            return Ok(Vec::new());
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|err| StoreError::json(&self.path, err))
    }

    fn save_resources(&self, resources: &[T]) -> StoreResult<()> {
        let text =
            serde_json::to_string(resources).map_err(|err| StoreError::json(&self.path, err))?;
        if self.read_container()?.as_deref() == Some(text.as_str()) {
            return Ok(());
        }
        write_atomic(&self.path, &text)
    }
}
