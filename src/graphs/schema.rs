//! Schema definitions for activity-type step graph tables

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::activity::ActivityType;

/// An activity type's ordered step sequence with its validation rules
///
/// The embedded JSON tables are the single source of truth for the per-type
/// wizard shape; no other component is permitted to special-case an activity
/// type directly. The step count is always derived from the steps array,
/// never declared separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepGraph {
    /// Activity type this graph belongs to
    pub activity_type: ActivityType,
    /// Ordered steps, 1-based contiguous indices
    pub steps: Vec<StepDefinition>,
    /// Per-field label overrides for this activity type
    #[serde(default)]
    pub field_labels: HashMap<String, String>,
    /// Validation rule bundles keyed by step index
    #[serde(default)]
    pub validation_rules: Vec<ValidationRuleBundle>,
}

/// Metadata for a single step slot in a graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// 1-based position in the graph
    pub index: u8,
    /// Step title shown in the progress indicator
    pub title: String,
    /// Brief description of what the step collects
    pub description: String,
    /// Which reusable step implementation renders this slot
    pub handler: StepHandler,
    /// Whether the step must be complete before submission
    #[serde(default = "default_true")]
    pub is_required: bool,
}

fn default_true() -> bool {
    true
}

/// Closed set of reusable step implementations
///
/// The same handler is reused across graphs with different titles and
/// required-ness; the handler also determines which [`crate::StepPayload`]
/// variant the step's form-data slot carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepHandler {
    BasicInfo,
    Scope,
    Compatibility,
    Capacity,
    Timeline,
    Team,
    Review,
}

/// Boolean validation flags for one step of one graph
///
/// Flags absent from the table default to false, so a graph only declares
/// the requirements it actually imposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRuleBundle {
    /// Step index this bundle applies to
    pub step: u8,
    #[serde(default)]
    pub require_source_cluster: bool,
    #[serde(default)]
    pub require_target_infrastructure: bool,
    #[serde(default)]
    pub require_target_cluster_name: bool,
    #[serde(default)]
    pub require_migration_strategy: bool,
    #[serde(default)]
    pub run_compatibility_check: bool,
    #[serde(default)]
    pub require_compatibility_pass: bool,
    #[serde(default)]
    pub require_capacity_validation: bool,
}

impl StepGraph {
    /// Parse a graph table from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Total number of steps, derived from the steps array
    pub fn total_steps(&self) -> u8 {
        self.steps.len() as u8
    }

    /// Get the step definition at a 1-based index
    pub fn step(&self, index: u8) -> Option<&StepDefinition> {
        if index == 0 {
            return None;
        }
        self.steps.get(usize::from(index) - 1)
    }

    /// Validation rules for a step index, all-false when the table
    /// declares none for that step
    pub fn rules_for(&self, index: u8) -> ValidationRuleBundle {
        self.validation_rules
            .iter()
            .copied()
            .find(|b| b.step == index)
            .unwrap_or(ValidationRuleBundle {
                step: index,
                ..ValidationRuleBundle::default()
            })
    }

    /// Label override for a field, falling back to the given default
    pub fn label<'a>(&'a self, field: &str, fallback: &'a str) -> &'a str {
        self.field_labels
            .get(field)
            .map(String::as_str)
            .unwrap_or(fallback)
    }

    /// Validate the table for structural consistency
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.steps.is_empty() {
            errors.push(format!("{} graph has no steps", self.activity_type));
        }

        // Indices must be 1..=len with no gaps
        for (pos, step) in self.steps.iter().enumerate() {
            let expected = pos as u8 + 1;
            if step.index != expected {
                errors.push(format!(
                    "{} graph step '{}' has index {} but sits at position {}",
                    self.activity_type, step.title, step.index, expected
                ));
            }
        }

        if let Some(first) = self.steps.first() {
            if first.handler != StepHandler::BasicInfo {
                errors.push(format!(
                    "{} graph must open with the basic_info step",
                    self.activity_type
                ));
            }
        }
        if let Some(last) = self.steps.last() {
            if last.handler != StepHandler::Review {
                errors.push(format!(
                    "{} graph must end with the review step",
                    self.activity_type
                ));
            }
        }

        // Rule bundles must reference an existing step
        for bundle in &self.validation_rules {
            if bundle.step == 0 || bundle.step > self.total_steps() {
                errors.push(format!(
                    "{} graph has a rule bundle for nonexistent step {}",
                    self.activity_type, bundle.step
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_json(steps: &str, rules: &str) -> String {
        format!(
            r#"{{
                "activity_type": "migration",
                "steps": {steps},
                "validation_rules": {rules}
            }}"#
        )
    }

    #[test]
    fn test_parse_minimal_graph() {
        let json = graph_json(
            r#"[
                {"index": 1, "title": "Details", "description": "Name it", "handler": "basic_info"},
                {"index": 2, "title": "Review", "description": "Check it", "handler": "review"}
            ]"#,
            r"[]",
        );
        let graph = StepGraph::from_json(&json).unwrap();
        assert_eq!(graph.total_steps(), 2);
        assert!(graph.steps[0].is_required);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_step_lookup_is_one_based() {
        let json = graph_json(
            r#"[
                {"index": 1, "title": "Details", "description": "", "handler": "basic_info"},
                {"index": 2, "title": "Review", "description": "", "handler": "review"}
            ]"#,
            r"[]",
        );
        let graph = StepGraph::from_json(&json).unwrap();
        assert!(graph.step(0).is_none());
        assert_eq!(graph.step(1).unwrap().handler, StepHandler::BasicInfo);
        assert_eq!(graph.step(2).unwrap().handler, StepHandler::Review);
        assert!(graph.step(3).is_none());
    }

    #[test]
    fn test_validate_catches_index_gap() {
        let json = graph_json(
            r#"[
                {"index": 1, "title": "Details", "description": "", "handler": "basic_info"},
                {"index": 3, "title": "Review", "description": "", "handler": "review"}
            ]"#,
            r"[]",
        );
        let graph = StepGraph::from_json(&json).unwrap();
        let errors = graph.validate().unwrap_err();
        assert!(errors[0].contains("index 3"));
    }

    #[test]
    fn test_validate_catches_out_of_range_rule_bundle() {
        let json = graph_json(
            r#"[
                {"index": 1, "title": "Details", "description": "", "handler": "basic_info"},
                {"index": 2, "title": "Review", "description": "", "handler": "review"}
            ]"#,
            r#"[{"step": 9, "require_source_cluster": true}]"#,
        );
        let graph = StepGraph::from_json(&json).unwrap();
        let errors = graph.validate().unwrap_err();
        assert!(errors[0].contains("nonexistent step 9"));
    }

    #[test]
    fn test_rules_for_defaults_to_all_false() {
        let json = graph_json(
            r#"[
                {"index": 1, "title": "Details", "description": "", "handler": "basic_info"},
                {"index": 2, "title": "Review", "description": "", "handler": "review"}
            ]"#,
            r"[]",
        );
        let graph = StepGraph::from_json(&json).unwrap();
        let rules = graph.rules_for(2);
        assert!(!rules.require_source_cluster);
        assert!(!rules.run_compatibility_check);
    }

    #[test]
    fn test_sparse_rule_flags_default_false() {
        let json = graph_json(
            r#"[
                {"index": 1, "title": "Details", "description": "", "handler": "basic_info"},
                {"index": 2, "title": "Review", "description": "", "handler": "review"}
            ]"#,
            r#"[{"step": 2, "require_source_cluster": true}]"#,
        );
        let graph = StepGraph::from_json(&json).unwrap();
        let rules = graph.rules_for(2);
        assert!(rules.require_source_cluster);
        assert!(!rules.require_migration_strategy);
    }
}
