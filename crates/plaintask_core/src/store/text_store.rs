//! Flat-file store over a record grammar.
//!
//! # Responsibility
//! - Expose the human-edited file as a `ResourceStore`.
//! - Make identifiers durable the first time a record is read.
//! - Give raw access to the file for whole-text editing.
//!
//! # Invariants
//! - Reads only splice identifier markers in; surrounding text is kept.
//! - Mutations rewrite the file in serialized form, and only when the
//!   serialized text differs from what is on disk.

use crate::grammar::{ProjectGrammar, RecordGrammar};
use crate::model::resource::Resource;
use crate::store::collection;
use crate::store::{ensure_dir, read_file, write_atomic, ResourceStore, StoreError, StoreResult};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

/// Store backed by one flat text file.
#[derive(Debug, Clone)]
pub struct TextStore<G = ProjectGrammar> {
    path: PathBuf,
    grammar: G,
}

impl TextStore<ProjectGrammar> {
    /// Opens the projects file at `path`, creating it when missing.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::with_grammar(path, ProjectGrammar)
    }
}

impl<G: RecordGrammar> TextStore<G> {
    /// Opens `path` with a custom grammar.
    ///
    /// A missing file is created holding an empty serialized collection.
    pub fn with_grammar(path: impl Into<PathBuf>, grammar: G) -> StoreResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(StoreError::InvalidPath("flat file path is empty".to_string()));
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        if !path.exists() {
            write_atomic(&path, &grammar.serialize(&[]))?;
            info!(
                "event=store_open module=store status=ok store=text path={} created=true",
                path.display()
            );
        }
        Ok(Self { path, grammar })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    /// Returns the file verbatim, or an empty string when it cannot be read.
    pub fn read_raw(&self) -> String {
        match read_file(&self.path) {
            Ok(text) => text,
            Err(err) => {
                log_failure("read_raw", "load", &err);
                String::new()
            }
        }
    }

    /// Replaces the whole file with `text`.
    ///
    /// Empty or whitespace-only text is rejected so a blank editor buffer
    /// never wipes the file. Returns whether the file now holds `text`.
    pub fn write_raw(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            warn!("event=store_write_raw module=store status=skip reason=empty_text");
            return false;
        }
        match write_atomic(&self.path, text) {
            Ok(()) => {
                info!(
                    "event=store_write_raw module=store status=ok bytes={}",
                    text.len()
                );
                true
            }
            Err(err) => {
                log_failure("write_raw", "save", &err);
                false
            }
        }
    }

    /// Reads the file and splices identifiers into anonymous records.
    ///
    /// Returns the on-disk text and the normalized text; the latter is
    /// written back when it differs.
    fn load_normalized(&self) -> StoreResult<(String, String)> {
        let original = read_file(&self.path)?;
        let normalized = self.grammar.normalize(&original);
        if normalized.changed() {
            write_atomic(&self.path, &normalized.text)?;
            info!(
                "event=text_normalize module=store status=ok assigned={}",
                normalized.assigned.len()
            );
        }
        Ok((original, normalized.text))
    }
}

impl<G: RecordGrammar> ResourceStore<G::Record> for TextStore<G> {
    fn label(&self) -> &str {
        "text"
    }

    fn load_resources(&self) -> StoreResult<Vec<G::Record>> {
        let (_, normalized) = self.load_normalized()?;
        Ok(self.grammar.parse(&normalized))
    }

    fn save_resources(&self, resources: &[G::Record]) -> StoreResult<()> {
        let serialized = self.grammar.serialize(resources);
        if read_file(&self.path)? == serialized {
            return Ok(());
        }
        write_atomic(&self.path, &serialized)
    }

    /// Reads the file once, then writes the serialized result only if it
    /// differs from the normalized on-disk text.
    fn commit<F>(&self, op: &str, mutate: F) -> Option<(Vec<G::Record>, usize)>
    where
        F: FnOnce(Vec<G::Record>) -> (Vec<G::Record>, usize),
    {
        let (original, normalized) = match self.load_normalized() {
            Ok(texts) => texts,
            Err(err) => {
                log_failure(op, "load", &err);
                return None;
            }
        };

        let (records, affected) = mutate(self.grammar.parse(&normalized));
        if affected == 0 {
            return Some((records, 0));
        }

        let serialized = self.grammar.serialize(&records);
        if serialized == original || serialized == normalized {
            info!(
                "event=store_{op} module=store status=skip store=text reason=unchanged"
            );
            return Some((records, affected));
        }
        if let Err(err) = write_atomic(&self.path, &serialized) {
            log_failure(op, "save", &err);
            return None;
        }
        Some((records, affected))
    }

    /// Appends records, refusing the whole batch when any record would not
    /// survive a serialize/parse cycle.
    fn create(&self, new: Vec<G::Record>) -> Vec<G::Record> {
        if let Some(rejected) = new.iter().find(|record| !self.grammar.accepts(record)) {
            warn!(
                "event=store_create module=store status=skip store=text reason=malformed_record id={}",
                rejected.id()
            );
            return Vec::new();
        }
        self.commit("create", |records| {
            collection::create(records, new)
        })
        .map(|(records, _)| records)
        .unwrap_or_default()
    }
}

fn log_failure(op: &str, stage: &str, err: &StoreError) {
    error!(
        "event=store_{op} module=store status=error store=text stage={stage} error_code={} error={}",
        err.code(),
        err
    );
}
