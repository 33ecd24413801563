//! Project use-case service.
//!
//! # Responsibility
//! - Wire the projects, completion-log and source stores from config.
//! - Provide list/create/update/delete entry points over reconciled data.
//! - Expose raw flat-file editing, tag statistics and periodic completion.
//!
//! # Invariants
//! - Every project read goes through reconciliation.
//! - Listings are sorted by `order`, ties keeping store order.
//! - Titles always carry the leading `- ` marker before they reach the file.

use crate::config::CoreConfig;
use crate::model::done_record::DoneRecord;
use crate::model::project::{last_order, Project, ProjectPatch, TagCounts};
use crate::model::resource::{new_resource_id, Resource, ResourceId};
use crate::model::source::Source;
use crate::model::text_project::{TextProject, TAG_MARKER, TITLE_MARKER};
use crate::service::project_expander::ProjectExpander;
use crate::store::json_store::JsonStore;
use crate::store::synced_store::{ReconcileReport, SyncedStore};
use crate::store::text_store::TextStore;
use crate::store::{Filter, ResourceStore, StoreError};
use log::info;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const PROJECTS_COLLECTION: &str = "projects";
pub const RECORDS_COLLECTION: &str = "records";
pub const SOURCES_COLLECTION: &str = "sources";

/// Composite store used for projects.
pub type ProjectStore = SyncedStore<Project, ProjectExpander>;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Store could not be opened or reconciled.
    Store(StoreError),
    ProjectNotFound(ResourceId),
    /// Title is blank or spans several lines.
    InvalidTitle(String),
    /// Raw replacement text is blank.
    EmptyRawContent,
    /// A write was refused or failed; details are in the log.
    WriteFailed(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::InvalidTitle(title) => write!(f, "invalid project title: `{title}`"),
            Self::EmptyRawContent => write!(f, "raw content cannot be empty"),
            Self::WriteFailed(operation) => write!(f, "write failed during {operation}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Entry point for project use-cases.
pub struct ProjectService {
    projects: ProjectStore,
    records: JsonStore<DoneRecord>,
    sources: JsonStore<Source>,
}

impl ProjectService {
    /// Opens every store named by `config`, creating missing files.
    pub fn open(config: &CoreConfig) -> ServiceResult<Self> {
        let text = TextStore::open(&config.projects_path)?;
        let structured = JsonStore::open(&config.data_dir, PROJECTS_COLLECTION)?;
        let records = JsonStore::open(&config.data_dir, RECORDS_COLLECTION)?;
        let sources = JsonStore::open(&config.data_dir, SOURCES_COLLECTION)?;
        info!(
            "event=service_open module=service status=ok projects_path={} data_dir={}",
            config.projects_path.display(),
            config.data_dir.display()
        );
        Ok(Self::from_stores(
            SyncedStore::new(text, structured, ProjectExpander),
            records,
            sources,
        ))
    }

    pub fn from_stores(
        projects: ProjectStore,
        records: JsonStore<DoneRecord>,
        sources: JsonStore<Source>,
    ) -> Self {
        Self {
            projects,
            records,
            sources,
        }
    }

    pub fn project_store(&self) -> &ProjectStore {
        &self.projects
    }

    /// Reconciles explicitly, surfacing load/save failures.
    pub fn sync(&self) -> ServiceResult<ReconcileReport> {
        let (_, report) = self.projects.reconcile_with_report()?;
        Ok(report)
    }

    /// All projects, sorted by `order`.
    pub fn projects(&self) -> Vec<Project> {
        sorted_by_order(self.projects.read(None))
    }

    /// Projects carrying `tag`, or all projects when `tag` is `None`.
    pub fn list_projects(&self, tag: Option<&str>) -> Vec<Project> {
        let projects = self.projects();
        match tag {
            Some(tag) => {
                let tag = normalize_tag(tag);
                projects
                    .into_iter()
                    .filter(|project| project.has_tag(&tag))
                    .collect()
            }
            None => projects,
        }
    }

    /// Appends a new project to the flat file and returns it.
    ///
    /// A missing `- ` prefix is added; tags without `#` get one.
    pub fn create_project(&self, title: &str, tags: &[&str]) -> ServiceResult<Project> {
        let title = normalize_title(title)?;
        let existing = self.projects.read(None);

        let mut text = TextProject::new(title);
        text.id = new_resource_id();
        text.tags = tags.iter().map(|tag| normalize_tag(tag)).collect();
        let project = Project::from_text(text, last_order(&existing) + 1);
        let id = project.id.clone();

        self.projects
            .create(vec![project])
            .into_iter()
            .find(|project| project.id == id)
            .ok_or(ServiceError::WriteFailed("create_project"))
    }

    /// Applies patches; content fields also reach the flat file.
    pub fn update_projects(&self, patches: Vec<ProjectPatch>) -> usize {
        self.projects.update_many(patches)
    }

    pub fn update_project(&self, id: &str, patch: ProjectPatch) -> usize {
        self.projects.update(id, patch)
    }

    pub fn delete_projects(&self, ids: &[ResourceId]) -> usize {
        self.projects.delete_many(ids)
    }

    pub fn tag_counts(&self) -> TagCounts {
        TagCounts::from_projects(&self.projects())
    }

    /// Flat file verbatim.
    pub fn raw_content(&self) -> String {
        self.projects.text_store().read_raw()
    }

    /// Replaces the flat file; the next read reconciles the new content.
    pub fn replace_raw_content(&self, text: &str) -> ServiceResult<()> {
        if text.trim().is_empty() {
            return Err(ServiceError::EmptyRawContent);
        }
        if !self.projects.text_store().write_raw(text) {
            return Err(ServiceError::WriteFailed("replace_raw_content"));
        }
        Ok(())
    }

    /// Logs one completion of `project_id` at `date` (epoch ms) and stamps
    /// the project's `done`.
    pub fn complete_periodic(&self, project_id: &str, date: i64) -> ServiceResult<DoneRecord> {
        let known = self
            .projects
            .read(None)
            .iter()
            .any(|project| project.id() == project_id);
        if !known {
            return Err(ServiceError::ProjectNotFound(project_id.to_string()));
        }

        let record = DoneRecord::new(project_id, date);
        let created = self.records.create(vec![record]);
        let Some(record) = created
            .into_iter()
            .rev()
            .find(|record| record.project_id == project_id && record.date == date)
        else {
            return Err(ServiceError::WriteFailed("complete_periodic"));
        };

        let patch = ProjectPatch {
            done: Some(Some(date)),
            ..ProjectPatch::default()
        };
        if self.projects.update(project_id, patch) == 0 {
            return Err(ServiceError::WriteFailed("complete_periodic"));
        }
        info!(
            "event=periodic_complete module=service status=ok project_id={} date={}",
            project_id, date
        );
        Ok(record)
    }

    /// Completion log, optionally restricted to one project.
    pub fn records(&self, project_id: Option<&str>) -> Vec<DoneRecord> {
        let filter = project_id.map(|id| {
            let mut filter = Filter::new();
            filter.insert("projectId".to_string(), Value::String(id.to_string()));
            filter
        });
        self.records.read(filter.as_ref())
    }

    /// Registered sources, sorted by `order`.
    pub fn sources(&self) -> Vec<Source> {
        let mut sources = self.sources.read(None);
        sources.sort_by_key(|source| source.order);
        sources
    }

    /// Registers a flat-file source at the end of the list.
    pub fn register_source(&self, title: &str, path: &str) -> ServiceResult<Source> {
        let existing = self.sources.read(None);
        let mut source = Source::new(title.trim(), path.trim());
        source.id = new_resource_id();
        source.order = existing
            .iter()
            .map(|source| source.order)
            .fold(0, i64::max)
            + 1;
        let id = source.id.clone();

        self.sources
            .create(vec![source])
            .into_iter()
            .find(|source| source.id == id)
            .ok_or(ServiceError::WriteFailed("register_source"))
    }
}

fn sorted_by_order(mut projects: Vec<Project>) -> Vec<Project> {
    projects.sort_by_key(|project| project.order);
    projects
}

fn normalize_title(title: &str) -> ServiceResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed.contains('\n') {
        return Err(ServiceError::InvalidTitle(title.to_string()));
    }
    if trimmed.starts_with(TITLE_MARKER) {
        return Ok(trimmed.to_string());
    }
    let bare = trimmed.trim_start_matches('-').trim_start();
    if bare.is_empty() {
        return Err(ServiceError::InvalidTitle(title.to_string()));
    }
    Ok(format!("{TITLE_MARKER}{bare}"))
}

fn normalize_tag(tag: &str) -> String {
    let trimmed = tag.trim();
    if trimmed.starts_with(TAG_MARKER) {
        trimmed.to_string()
    } else {
        format!("{TAG_MARKER}{trimmed}")
    }
}
