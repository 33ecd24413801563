//! Project use-case services.
//!
//! # Responsibility
//! - Plug the project expansion strategy into the composite store.
//! - Orchestrate store calls into use-case level APIs for executables.

pub mod project_expander;
pub mod project_service;
