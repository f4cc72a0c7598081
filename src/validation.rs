//! Per-step completion rules and the progress view.
//!
//! Completion is a pure function of the step graph and the current form-data
//! snapshot. A payload stored under an index whose step uses a different
//! handler counts as absent; validation never panics on shape mismatches.

use serde::Serialize;

use crate::activity::{FormData, StepPayload};
use crate::graphs::{StepGraph, StepHandler};

/// Is the step at `index` complete for this graph and snapshot?
///
/// Unknown indices are never complete.
pub fn is_step_complete(index: u8, form_data: &FormData, graph: &StepGraph) -> bool {
    let Some(step) = graph.step(index) else {
        return false;
    };
    let payload = form_data.get(&index);
    let rules = graph.rules_for(index);

    match step.handler {
        StepHandler::BasicInfo => match payload {
            Some(StepPayload::BasicInfo(info)) => {
                !info.name.trim().is_empty() && info.activity_type.is_some()
            }
            _ => false,
        },
        StepHandler::Scope => {
            let scope = match payload {
                Some(StepPayload::Scope(scope)) => scope,
                // With no requirements the scope step is trivially complete
                _ => return !has_scope_requirements(&rules),
            };
            let filled = |field: &Option<String>| {
                field.as_deref().is_some_and(|v| !v.trim().is_empty())
            };
            (!rules.require_source_cluster || filled(&scope.source_cluster))
                && (!rules.require_target_infrastructure || filled(&scope.target_infrastructure))
                && (!rules.require_target_cluster_name || filled(&scope.target_cluster_name))
                && (!rules.require_migration_strategy || filled(&scope.migration_strategy))
        }
        StepHandler::Compatibility => {
            if !rules.run_compatibility_check {
                return true;
            }
            match payload {
                Some(StepPayload::Compatibility(compat)) => {
                    !compat.hardware_specs.is_empty()
                        && (!rules.require_compatibility_pass || compat.passed == Some(true))
                }
                _ => false,
            }
        }
        StepHandler::Capacity => {
            if !rules.require_capacity_validation {
                return true;
            }
            match payload {
                Some(StepPayload::Capacity(capacity)) => capacity.target_hardware.is_some(),
                _ => false,
            }
        }
        StepHandler::Timeline => match payload {
            Some(StepPayload::Timeline(timeline)) => timeline
                .result
                .as_ref()
                .is_some_and(|r| r.vm_count.is_some() && r.host_count.is_some()),
            _ => false,
        },
        // Team assignment is optional by design
        StepHandler::Team => true,
        StepHandler::Review => match payload {
            Some(StepPayload::Review(review)) => review.reviewed,
            _ => false,
        },
    }
}

fn has_scope_requirements(rules: &crate::graphs::ValidationRuleBundle) -> bool {
    rules.require_source_cluster
        || rules.require_target_infrastructure
        || rules.require_target_cluster_name
        || rules.require_migration_strategy
}

/// One entry of the progress indicator view
#[derive(Debug, Clone, Serialize)]
pub struct StepInfo {
    pub index: u8,
    pub title: String,
    pub description: String,
    pub handler: StepHandler,
    pub is_required: bool,
    pub is_complete: bool,
    pub is_active: bool,
}

/// Map every step of the graph through completion plus an active flag.
///
/// Sole input to progress-indicator rendering.
pub fn step_completion(form_data: &FormData, graph: &StepGraph, current_step: u8) -> Vec<StepInfo> {
    graph
        .steps
        .iter()
        .map(|step| StepInfo {
            index: step.index,
            title: step.title.clone(),
            description: step.description.clone(),
            handler: step.handler,
            is_required: step.is_required,
            is_complete: is_step_complete(step.index, form_data, graph),
            is_active: step.index == current_step,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{
        ActivityType, BasicInfoPayload, CapacityPayload, CompatibilityPayload, HardwareSpec,
        ReviewPayload, ScopePayload, TargetHardware, TimelinePayload, TimelineResult,
    };
    use crate::graphs::resolve;

    fn basic_info(name: &str, activity_type: Option<ActivityType>) -> StepPayload {
        StepPayload::BasicInfo(BasicInfoPayload {
            name: name.to_string(),
            activity_type,
            description: None,
        })
    }

    #[test]
    fn test_step_one_requires_name_and_type() {
        let graph = resolve(None);
        let mut form_data = FormData::new();
        assert!(!is_step_complete(1, &form_data, graph));

        form_data.insert(1, basic_info("", Some(ActivityType::Migration)));
        assert!(!is_step_complete(1, &form_data, graph));

        form_data.insert(1, basic_info("Q3 Migration", None));
        assert!(!is_step_complete(1, &form_data, graph));

        form_data.insert(1, basic_info("Q3 Migration", Some(ActivityType::Migration)));
        assert!(is_step_complete(1, &form_data, graph));
    }

    #[test]
    fn test_whitespace_name_is_not_complete() {
        let graph = resolve(None);
        let mut form_data = FormData::new();
        form_data.insert(1, basic_info("   ", Some(ActivityType::Migration)));
        assert!(!is_step_complete(1, &form_data, graph));
    }

    #[test]
    fn test_scope_honours_per_graph_flags() {
        let migration = resolve(Some(ActivityType::Migration));
        let decommission = resolve(Some(ActivityType::Decommission));

        let mut form_data = FormData::new();
        form_data.insert(
            2,
            StepPayload::Scope(ScopePayload {
                source_cluster: Some("prod-east".to_string()),
                ..ScopePayload::default()
            }),
        );

        // Decommission only requires the source cluster
        assert!(is_step_complete(2, &form_data, decommission));
        // Migration also requires target fields and a strategy
        assert!(!is_step_complete(2, &form_data, migration));

        form_data.insert(
            2,
            StepPayload::Scope(ScopePayload {
                source_cluster: Some("prod-east".to_string()),
                target_infrastructure: Some("vx-rail".to_string()),
                target_cluster_name: Some("prod-east-2".to_string()),
                migration_strategy: Some("lift-and-shift".to_string()),
            }),
        );
        assert!(is_step_complete(2, &form_data, migration));
    }

    #[test]
    fn test_compatibility_requires_specs_when_check_enabled() {
        let migration = resolve(Some(ActivityType::Migration));
        let mut form_data = FormData::new();
        assert!(!is_step_complete(3, &form_data, migration));

        form_data.insert(
            3,
            StepPayload::Compatibility(CompatibilityPayload {
                hardware_specs: vec![HardwareSpec {
                    model: "R740xd".to_string(),
                    cpu_generation: Some("skylake".to_string()),
                    compatible: Some(true),
                }],
                passed: Some(true),
            }),
        );
        assert!(is_step_complete(3, &form_data, migration));
    }

    #[test]
    fn test_compatibility_failure_blocks_step() {
        let migration = resolve(Some(ActivityType::Migration));
        let mut form_data = FormData::new();
        form_data.insert(
            3,
            StepPayload::Compatibility(CompatibilityPayload {
                hardware_specs: vec![HardwareSpec {
                    model: "R640".to_string(),
                    cpu_generation: Some("broadwell".to_string()),
                    compatible: Some(false),
                }],
                passed: Some(false),
            }),
        );
        assert!(!is_step_complete(3, &form_data, migration));
    }

    #[test]
    fn test_capacity_requires_target_hardware() {
        let migration = resolve(Some(ActivityType::Migration));
        let mut form_data = FormData::new();
        form_data.insert(4, StepPayload::Capacity(CapacityPayload::default()));
        assert!(!is_step_complete(4, &form_data, migration));

        form_data.insert(
            4,
            StepPayload::Capacity(CapacityPayload {
                target_hardware: Some(TargetHardware {
                    model: "R760".to_string(),
                    node_count: 8,
                    cores_per_node: Some(64),
                    memory_gb_per_node: Some(512),
                }),
            }),
        );
        assert!(is_step_complete(4, &form_data, migration));
    }

    #[test]
    fn test_timeline_requires_counts() {
        let migration = resolve(Some(ActivityType::Migration));
        let mut form_data = FormData::new();

        form_data.insert(
            5,
            StepPayload::Timeline(TimelinePayload {
                result: Some(TimelineResult {
                    vm_count: Some(240),
                    host_count: None,
                    estimated_days: None,
                }),
            }),
        );
        assert!(!is_step_complete(5, &form_data, migration));

        form_data.insert(
            5,
            StepPayload::Timeline(TimelinePayload {
                result: Some(TimelineResult {
                    vm_count: Some(240),
                    host_count: Some(12),
                    estimated_days: Some(21),
                }),
            }),
        );
        assert!(is_step_complete(5, &form_data, migration));
    }

    #[test]
    fn test_team_always_complete() {
        let migration = resolve(Some(ActivityType::Migration));
        let form_data = FormData::new();
        assert!(is_step_complete(6, &form_data, migration));
    }

    #[test]
    fn test_review_requires_acknowledgement() {
        let migration = resolve(Some(ActivityType::Migration));
        let mut form_data = FormData::new();
        assert!(!is_step_complete(7, &form_data, migration));

        form_data.insert(7, StepPayload::Review(ReviewPayload { reviewed: false }));
        assert!(!is_step_complete(7, &form_data, migration));

        form_data.insert(7, StepPayload::Review(ReviewPayload { reviewed: true }));
        assert!(is_step_complete(7, &form_data, migration));
    }

    #[test]
    fn test_mismatched_payload_counts_as_absent() {
        let migration = resolve(Some(ActivityType::Migration));
        let mut form_data = FormData::new();
        form_data.insert(7, basic_info("wrong slot", Some(ActivityType::Migration)));
        assert!(!is_step_complete(7, &form_data, migration));
    }

    #[test]
    fn test_out_of_range_step_is_incomplete() {
        let maintenance = resolve(Some(ActivityType::Maintenance));
        let form_data = FormData::new();
        assert!(!is_step_complete(0, &form_data, maintenance));
        assert!(!is_step_complete(5, &form_data, maintenance));
    }

    #[test]
    fn test_step_completion_view() {
        let maintenance = resolve(Some(ActivityType::Maintenance));
        let mut form_data = FormData::new();
        form_data.insert(1, basic_info("Rack Refresh", Some(ActivityType::Maintenance)));

        let view = step_completion(&form_data, maintenance, 2);
        assert_eq!(view.len(), 4);
        assert!(view[0].is_complete);
        assert!(!view[0].is_active);
        assert!(view[1].is_active);
        assert!(!view[1].is_complete);
        // Timeline step incomplete, review incomplete
        assert!(!view[2].is_complete);
        assert!(!view[3].is_complete);
    }
}
