//! In-memory draft/entity store.
//!
//! Full implementation of the store contract with TTL-based draft expiry,
//! used by the test suites and for running the engine without a server.
//! Failure injection and the write log exist so tests can observe exactly
//! which writes reached the store.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{
    Activity, ActivityPatch, Draft, DraftHandle, DraftStore, SaveAck, StoreError,
    WizardStateSnapshot,
};
use crate::activity::{activity_type_of, ActivityType, StepPayload};

struct StoredDraft {
    name: String,
    activity_type: ActivityType,
    wizard_state: Option<WizardStateSnapshot>,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    drafts: HashMap<String, StoredDraft>,
    entities: HashMap<String, Activity>,
    write_log: Vec<WizardStateSnapshot>,
}

/// In-process [`DraftStore`]
pub struct MemoryDraftStore {
    inner: Mutex<Inner>,
    ttl: ChronoDuration,
    fail_saves: AtomicBool,
    completions: AtomicUsize,
}

impl Default for MemoryDraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDraftStore {
    /// Create a store with the default 24h draft TTL
    pub fn new() -> Self {
        Self::with_ttl(ChronoDuration::hours(24))
    }

    pub fn with_ttl(ttl: ChronoDuration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl,
            fail_saves: AtomicBool::new(false),
            completions: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent save/complete call fail with a network error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Force-expire a draft, as the server-side TTL eviction would
    pub fn expire_draft(&self, activity_id: &str) {
        if let Some(draft) = self.lock().drafts.get_mut(activity_id) {
            draft.expires_at = Utc::now() - ChronoDuration::seconds(1);
        }
    }

    /// Snapshots written via `save_progress`, in arrival order
    pub fn write_log(&self) -> Vec<WizardStateSnapshot> {
        self.lock().write_log.clone()
    }

    /// Number of completion transactions processed
    pub fn completion_count(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// Seed a finalized entity for edit-mode tests
    pub fn insert_entity(&self, entity: Activity) {
        self.lock()
            .entities
            .insert(entity.activity_id.clone(), entity);
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            Err(StoreError::network("injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn start(
        &self,
        name: &str,
        activity_type: ActivityType,
    ) -> Result<DraftHandle, StoreError> {
        self.check_failure()?;
        let activity_id = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.ttl;
        self.lock().drafts.insert(
            activity_id.clone(),
            StoredDraft {
                name: name.to_string(),
                activity_type,
                wizard_state: None,
                expires_at,
            },
        );
        Ok(DraftHandle {
            activity_id,
            expires_at,
        })
    }

    async fn save_progress(
        &self,
        activity_id: &str,
        state: &WizardStateSnapshot,
    ) -> Result<SaveAck, StoreError> {
        self.check_failure()?;
        let mut inner = self.lock();
        let draft = inner
            .drafts
            .get_mut(activity_id)
            .ok_or_else(|| StoreError::not_found(activity_id))?;
        if draft.expires_at < Utc::now() {
            return Err(StoreError::expired(activity_id));
        }
        draft.wizard_state = Some(state.clone());
        draft.expires_at = Utc::now() + self.ttl;
        let expires_at = draft.expires_at;
        inner.write_log.push(state.clone());
        Ok(SaveAck {
            saved_at: Utc::now(),
            expires_at: Some(expires_at),
        })
    }

    async fn get_draft(&self, activity_id: &str) -> Result<Draft, StoreError> {
        let inner = self.lock();
        let draft = inner
            .drafts
            .get(activity_id)
            .ok_or_else(|| StoreError::expired(activity_id))?;
        if draft.expires_at < Utc::now() {
            return Err(StoreError::expired(activity_id));
        }
        Ok(Draft {
            wizard_state: draft.wizard_state.clone(),
            expires_at: Some(draft.expires_at),
        })
    }

    async fn complete_draft(
        &self,
        activity_id: &str,
        state: &WizardStateSnapshot,
    ) -> Result<Activity, StoreError> {
        self.check_failure()?;
        let mut inner = self.lock();
        let draft = inner
            .drafts
            .remove(activity_id)
            .ok_or_else(|| StoreError::expired(activity_id))?;

        // Prefer the submitted snapshot's step-1 data over the values the
        // draft was opened with
        let (name, description) = match state.form_data.get(&1) {
            Some(StepPayload::BasicInfo(info)) => (info.name.clone(), info.description.clone()),
            _ => (draft.name, None),
        };
        let activity_type = activity_type_of(&state.form_data).unwrap_or(draft.activity_type);

        let entity = Activity {
            activity_id: activity_id.to_string(),
            name,
            activity_type,
            description,
            wizard_state: Some(state.clone()),
            updated_at: Utc::now(),
        };
        inner
            .entities
            .insert(activity_id.to_string(), entity.clone());
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(entity)
    }

    async fn get_entity(&self, activity_id: &str) -> Result<Activity, StoreError> {
        self.lock()
            .entities
            .get(activity_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(activity_id))
    }

    async fn update_entity(
        &self,
        activity_id: &str,
        patch: &ActivityPatch,
    ) -> Result<Activity, StoreError> {
        self.check_failure()?;
        let mut inner = self.lock();
        let entity = inner
            .entities
            .get_mut(activity_id)
            .ok_or_else(|| StoreError::not_found(activity_id))?;

        if let Some(name) = &patch.name {
            entity.name = name.clone();
        }
        if let Some(activity_type) = patch.activity_type {
            entity.activity_type = activity_type;
        }
        if let Some(description) = &patch.description {
            entity.description = Some(description.clone());
        }
        if let Some(wizard_state) = &patch.wizard_state {
            entity.wizard_state = Some(wizard_state.clone());
        }
        entity.updated_at = Utc::now();
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(entity.clone())
    }
}
