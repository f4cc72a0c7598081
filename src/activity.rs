//! Activity types and typed per-step payloads.
//!
//! The activity type chosen in step 1 determines the entire step graph.
//! Per-step form data is a tagged union keyed by step index, one concrete
//! variant per reusable step handler, so the validation engine can match
//! exhaustively instead of probing untyped blobs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of activity categories selectable in step 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    /// Move workloads from a source cluster to new target infrastructure
    Migration,
    /// Retire a cluster and drain its workloads
    Decommission,
    /// Add capacity to existing infrastructure
    Expansion,
    /// Scheduled maintenance window on existing hardware
    Maintenance,
    /// Hardware lifecycle replacement (like-for-like refresh)
    Lifecycle,
}

impl ActivityType {
    /// Returns all activity types in display order
    pub fn all() -> &'static [ActivityType] {
        &[
            ActivityType::Migration,
            ActivityType::Decommission,
            ActivityType::Expansion,
            ActivityType::Maintenance,
            ActivityType::Lifecycle,
        ]
    }

    /// Returns the wire key for this activity type
    pub fn key(&self) -> &'static str {
        match self {
            ActivityType::Migration => "migration",
            ActivityType::Decommission => "decommission",
            ActivityType::Expansion => "expansion",
            ActivityType::Maintenance => "maintenance",
            ActivityType::Lifecycle => "lifecycle",
        }
    }

    /// Returns the human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityType::Migration => "Migration",
            ActivityType::Decommission => "Decommission",
            ActivityType::Expansion => "Expansion",
            ActivityType::Maintenance => "Maintenance",
            ActivityType::Lifecycle => "Lifecycle Replacement",
        }
    }

    /// Returns a brief description of when to use this activity type
    pub fn description(&self) -> &'static str {
        match self {
            ActivityType::Migration => "Move workloads to new target infrastructure",
            ActivityType::Decommission => "Retire a cluster and drain its workloads",
            ActivityType::Expansion => "Add capacity to existing infrastructure",
            ActivityType::Maintenance => "Plan a maintenance window on existing hardware",
            ActivityType::Lifecycle => "Replace aging hardware like-for-like",
        }
    }

    /// Look up an activity type by its wire key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.key() == key)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Per-step form data keyed by 1-based step index
pub type FormData = BTreeMap<u8, StepPayload>;

/// Read the chosen activity type out of the step-1 payload, if any
pub fn activity_type_of(form_data: &FormData) -> Option<ActivityType> {
    match form_data.get(&1) {
        Some(StepPayload::BasicInfo(info)) => info.activity_type,
        _ => None,
    }
}

/// Payload slot for a single wizard step
///
/// Variants correspond one-to-one with the reusable step handlers declared
/// in the graph tables. A payload stored under an index whose step uses a
/// different handler is treated as absent by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepPayload {
    BasicInfo(BasicInfoPayload),
    Scope(ScopePayload),
    Compatibility(CompatibilityPayload),
    Capacity(CapacityPayload),
    Timeline(TimelinePayload),
    Team(TeamPayload),
    Review(ReviewPayload),
}

/// Step 1: activity name, type, and optional description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicInfoPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub activity_type: Option<ActivityType>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Scope step: which infrastructure the activity touches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopePayload {
    #[serde(default)]
    pub source_cluster: Option<String>,
    #[serde(default)]
    pub target_infrastructure: Option<String>,
    #[serde(default)]
    pub target_cluster_name: Option<String>,
    #[serde(default)]
    pub migration_strategy: Option<String>,
}

/// One hardware model evaluated by the compatibility checker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareSpec {
    pub model: String,
    #[serde(default)]
    pub cpu_generation: Option<String>,
    /// Result of the external compatibility check, when it has run
    #[serde(default)]
    pub compatible: Option<bool>,
}

/// Compatibility step: hardware specs gathered by the external checker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityPayload {
    #[serde(default)]
    pub hardware_specs: Vec<HardwareSpec>,
    /// Overall pass/fail verdict from the checker
    #[serde(default)]
    pub passed: Option<bool>,
}

/// Target hardware selection produced by the capacity calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetHardware {
    pub model: String,
    pub node_count: u32,
    #[serde(default)]
    pub cores_per_node: Option<u32>,
    #[serde(default)]
    pub memory_gb_per_node: Option<u32>,
}

/// Capacity step: the validated target hardware choice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityPayload {
    #[serde(default)]
    pub target_hardware: Option<TargetHardware>,
}

/// Output of the external timeline estimator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineResult {
    #[serde(default)]
    pub vm_count: Option<u32>,
    #[serde(default)]
    pub host_count: Option<u32>,
    #[serde(default)]
    pub estimated_days: Option<u32>,
}

/// Timeline step: estimator result slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelinePayload {
    #[serde(default)]
    pub result: Option<TimelineResult>,
}

/// A person assigned to the activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Team assignment step, optional by design
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamPayload {
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

/// Final review step: explicit acknowledgement before submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewPayload {
    #[serde(default)]
    pub reviewed: bool,
}
