//! Remote draft/entity store contract and implementations.
//!
//! The engine only ever talks to the store through the [`DraftStore`] trait;
//! [`HttpDraftStore`] is the production client and [`MemoryDraftStore`] backs
//! tests and offline runs.

pub mod error;
pub mod http;
pub mod memory;

pub use error::StoreError;
pub use http::HttpDraftStore;
pub use memory::MemoryDraftStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityType, FormData};

/// The portion of wizard state persisted remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardStateSnapshot {
    pub current_step: u8,
    pub form_data: FormData,
}

/// Returned by the store when a draft is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftHandle {
    pub activity_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Remote projection of a not-yet-finalized wizard session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub wizard_state: Option<WizardStateSnapshot>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Acknowledgement of a progress write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAck {
    /// Server-side timestamp of the write
    pub saved_at: DateTime<Utc>,
    /// Refreshed TTL, when the server extends it on save
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A finalized activity entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub activity_id: String,
    pub name: String,
    pub activity_type: ActivityType,
    #[serde(default)]
    pub description: Option<String>,
    /// Stored wizard snapshot, present when the entity was created through
    /// the wizard and the server kept it
    #[serde(default)]
    pub wizard_state: Option<WizardStateSnapshot>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied to an existing entity in edit mode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wizard_state: Option<WizardStateSnapshot>,
}

/// Draft/entity store consumed by the persistence coordinator
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Create a draft for a named activity; the store assigns the id
    async fn start(
        &self,
        name: &str,
        activity_type: ActivityType,
    ) -> Result<DraftHandle, StoreError>;

    /// Persist the wizard snapshot against an existing draft
    async fn save_progress(
        &self,
        activity_id: &str,
        state: &WizardStateSnapshot,
    ) -> Result<SaveAck, StoreError>;

    /// Load a draft for resume; expired drafts yield [`StoreError::Expired`]
    async fn get_draft(&self, activity_id: &str) -> Result<Draft, StoreError>;

    /// Convert the draft into a finalized entity
    async fn complete_draft(
        &self,
        activity_id: &str,
        state: &WizardStateSnapshot,
    ) -> Result<Activity, StoreError>;

    /// Load a finalized entity (edit mode)
    async fn get_entity(&self, activity_id: &str) -> Result<Activity, StoreError>;

    /// Apply an edit-mode patch to a finalized entity
    async fn update_entity(
        &self,
        activity_id: &str,
        patch: &ActivityPatch,
    ) -> Result<Activity, StoreError>;
}
