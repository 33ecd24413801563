//! Core library for plaintask.
//! Keeps a hand-edited projects file and its structured metadata in step.

pub mod config;
pub mod grammar;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig};
pub use grammar::{ProjectGrammar, RecordGrammar};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::done_record::DoneRecord;
pub use model::project::{Project, ProjectPatch, ProjectStatus, TagCounts};
pub use model::resource::{Resource, ResourceId, ResourcePatch};
pub use model::source::Source;
pub use model::text_project::TextProject;
pub use service::project_expander::ProjectExpander;
pub use service::project_service::{ProjectService, ProjectStore, ServiceError, ServiceResult};
pub use store::json_store::JsonStore;
pub use store::synced_store::{Expand, ReconcileReport, SyncedStore};
pub use store::text_store::TextStore;
pub use store::{Filter, ResourceStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
