//! Expansion of flat-file projects into structured projects.
//!
//! # Invariants
//! - Known ids keep `order`, `done` and `periodic_data`.
//! - New ids get `last_order + position + 1`, counted within one batch.

use crate::model::project::{last_order, Project};
use crate::model::resource::Resource;
use crate::model::text_project::TextProject;
use crate::store::synced_store::Expand;
use std::collections::HashMap;

/// [`Expand`] strategy for projects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectExpander;

impl Expand<TextProject, Project> for ProjectExpander {
    fn expand(&self, candidates: &[TextProject], existing: &[Project]) -> Vec<Project> {
        let base = last_order(existing);
        let by_id: HashMap<&str, &Project> = existing
            .iter()
            .map(|project| (project.id(), project))
            .collect();
        let mut next_new = 0;
        candidates
            .iter()
            .map(|candidate| {
                match by_id.get(candidate.id()) {
                    Some(project) => {
                        let mut merged = (*project).clone();
                        merged.absorb_text(candidate);
                        merged
                    }
                    None => {
                        next_new += 1;
                        Project::from_text(candidate.clone(), base + next_new)
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ProjectExpander;
    use crate::model::project::{PeriodicData, Project};
    use crate::model::text_project::TextProject;
    use crate::store::synced_store::Expand;

    fn text(id: &str, title: &str) -> TextProject {
        let mut record = TextProject::new(title);
        record.id = id.to_string();
        record
    }

    #[test]
    fn known_ids_keep_metadata_and_take_text_content() {
        let mut stored = Project::from_text(text("a", "- Old title"), 5);
        stored.done = Some(1_700_000_000_000);
        stored.periodic_data = Some(PeriodicData {
            scheduled: Some(1),
            period: Some(7),
        });

        let expanded = ProjectExpander.expand(&[text("a", "- New title #periodic")], &[stored]);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].title, "- New title #periodic");
        assert_eq!(expanded[0].order, 5);
        assert_eq!(expanded[0].done, Some(1_700_000_000_000));
        assert!(expanded[0].periodic);
        assert_eq!(expanded[0].periodic_data.as_ref().unwrap().period, Some(7));
    }

    #[test]
    fn new_ids_are_numbered_after_the_last_order() {
        let stored = Project::from_text(text("a", "- Existing"), 3);
        let expanded = ProjectExpander.expand(
            &[text("b", "- First new"), text("c", "- Second new")],
            &[stored],
        );
        let orders: Vec<i64> = expanded.iter().map(|project| project.order).collect();
        assert_eq!(orders, vec![4, 5]);
    }

    #[test]
    fn mixed_batch_keeps_candidate_order() {
        let stored: Vec<Project> = (1..=3)
            .map(|n| Project::from_text(text(&format!("id-{n}"), "- Stored"), n * 10))
            .collect();
        let candidates = vec![
            text("id-3", "- Third"),
            text("fresh", "- Fresh"),
            text("id-1", "- First"),
        ];

        let expanded = ProjectExpander.expand(&candidates, &stored);
        let summary: Vec<(&str, i64)> = expanded
            .iter()
            .map(|project| (project.title.as_str(), project.order))
            .collect();
        assert_eq!(summary, vec![("- Third", 30), ("- Fresh", 31), ("- First", 10)]);
    }

    #[test]
    fn empty_structured_set_starts_at_one() {
        let expanded = ProjectExpander.expand(&[text("a", "- Only")], &[]);
        assert_eq!(expanded[0].order, 1);
        assert!(!expanded[0].periodic);
    }
}
