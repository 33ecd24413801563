//! Domain records stored by plaintask.
//!
//! # Responsibility
//! - Define the resource contract every store is generic over.
//! - Define the text-representable project and its structured superset.
//! - Define supporting entities (completion log, registered sources).
//!
//! # Invariants
//! - Every record is identified by a string id that never changes once set.
//! - Wire names follow the existing JSON containers (`_id`, camelCase).

pub mod done_record;
pub mod project;
pub mod resource;
pub mod source;
pub mod text_project;
