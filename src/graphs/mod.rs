//! Embedded step graph tables and the activity-type resolver
//!
//! Each activity type's wizard shape lives in a JSON table embedded at
//! compile time. The tables are parsed once on first access and cached for
//! the life of the process; resolution is a pure lookup.

pub mod schema;

pub use schema::{StepDefinition, StepGraph, StepHandler, ValidationRuleBundle};

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::activity::ActivityType;

/// Returns the embedded JSON table for an activity type
/// Source of truth: src/graphs/tables/
fn table_json(activity_type: ActivityType) -> &'static str {
    match activity_type {
        ActivityType::Migration => include_str!("tables/migration.json"),
        ActivityType::Decommission => include_str!("tables/decommission.json"),
        ActivityType::Expansion => include_str!("tables/expansion.json"),
        ActivityType::Maintenance => include_str!("tables/maintenance.json"),
        ActivityType::Lifecycle => include_str!("tables/lifecycle.json"),
    }
}

/// Parsed graph tables, built once at first access.
///
/// The tables are compile-time assets; a malformed or structurally invalid
/// table is a packaging defect, so parsing failures abort rather than
/// surface as runtime errors.
static GRAPHS: Lazy<HashMap<ActivityType, StepGraph>> = Lazy::new(|| {
    ActivityType::all()
        .iter()
        .map(|activity_type| {
            let graph = StepGraph::from_json(table_json(*activity_type)).unwrap_or_else(|e| {
                panic!("embedded {activity_type} graph table is not valid JSON: {e}")
            });
            if let Err(errors) = graph.validate() {
                panic!(
                    "embedded {activity_type} graph table is inconsistent: {}",
                    errors.join("; ")
                );
            }
            (*activity_type, graph)
        })
        .collect()
});

/// Resolve the step graph for an activity type.
///
/// Total and deterministic. `None` means step 1 has not been answered yet;
/// the migration graph is the safe default so the wizard can render step 1
/// before a type is chosen.
pub fn resolve(activity_type: Option<ActivityType>) -> &'static StepGraph {
    let key = activity_type.unwrap_or(ActivityType::Migration);
    // Every enum variant has a table entry, checked by the Lazy initializer
    &GRAPHS[&key]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tables_parse_and_validate() {
        for activity_type in ActivityType::all() {
            let graph = resolve(Some(*activity_type));
            assert_eq!(graph.activity_type, *activity_type);
            assert!(graph.validate().is_ok());
        }
    }

    #[test]
    fn test_total_steps_matches_steps_length() {
        for activity_type in ActivityType::all() {
            let graph = resolve(Some(*activity_type));
            assert_eq!(usize::from(graph.total_steps()), graph.steps.len());
        }
    }

    #[test]
    fn test_expected_step_counts() {
        assert_eq!(resolve(Some(ActivityType::Migration)).total_steps(), 7);
        assert_eq!(resolve(Some(ActivityType::Decommission)).total_steps(), 5);
        assert_eq!(resolve(Some(ActivityType::Expansion)).total_steps(), 6);
        assert_eq!(resolve(Some(ActivityType::Maintenance)).total_steps(), 4);
        assert_eq!(resolve(Some(ActivityType::Lifecycle)).total_steps(), 6);
    }

    #[test]
    fn test_unanswered_type_defaults_to_migration() {
        let graph = resolve(None);
        assert_eq!(graph.activity_type, ActivityType::Migration);
        assert_eq!(graph.total_steps(), 7);
    }

    #[test]
    fn test_maintenance_skips_compatibility_and_capacity() {
        let graph = resolve(Some(ActivityType::Maintenance));
        assert!(graph
            .steps
            .iter()
            .all(|s| s.handler != StepHandler::Compatibility
                && s.handler != StepHandler::Capacity));
    }

    #[test]
    fn test_migration_rules() {
        let graph = resolve(Some(ActivityType::Migration));
        let scope = graph.rules_for(2);
        assert!(scope.require_source_cluster);
        assert!(scope.require_target_infrastructure);
        assert!(scope.require_target_cluster_name);
        assert!(scope.require_migration_strategy);
        assert!(graph.rules_for(3).run_compatibility_check);
        assert!(graph.rules_for(4).require_capacity_validation);
    }

    #[test]
    fn test_decommission_only_requires_source() {
        let graph = resolve(Some(ActivityType::Decommission));
        let scope = graph.rules_for(2);
        assert!(scope.require_source_cluster);
        assert!(!scope.require_target_infrastructure);
        assert!(!scope.require_target_cluster_name);
        assert!(!scope.require_migration_strategy);
    }

    #[test]
    fn test_field_label_overrides() {
        let graph = resolve(Some(ActivityType::Decommission));
        assert_eq!(
            graph.label("source_cluster", "Source Cluster"),
            "Cluster to Decommission"
        );
        assert_eq!(
            graph.label("migration_strategy", "Migration Strategy"),
            "Migration Strategy"
        );
    }

    #[test]
    fn test_team_steps_are_optional() {
        for activity_type in ActivityType::all() {
            let graph = resolve(Some(*activity_type));
            for step in &graph.steps {
                if step.handler == StepHandler::Team {
                    assert!(!step.is_required, "{activity_type} team step must be optional");
                }
            }
        }
    }
}
