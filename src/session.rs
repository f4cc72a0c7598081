//! The stateful orchestrator tying resolver, validation, navigation and
//! persistence into the single contract the rendering layer consumes.
//!
//! The rendering layer receives a [`WizardSession`] handle at construction
//! and passes it explicitly to step components; there is no ambient global
//! lookup. Each wizard instance owns one independent session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::activity::{activity_type_of, BasicInfoPayload, FormData, StepPayload};
use crate::config::EngineConfig;
use crate::error::WizardError;
use crate::graphs::{self, StepGraph};
use crate::navigation::NavigationController;
use crate::persistence::{CompletionCallback, PersistenceCoordinator};
use crate::store::{Activity, DraftStore, SaveAck, WizardStateSnapshot};
use crate::validation::{self, StepInfo};

/// Whether the session is creating a new activity or editing a finalized one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardMode {
    Create,
    Edit,
}

impl fmt::Display for WizardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardMode::Create => write!(f, "create"),
            WizardMode::Edit => write!(f, "edit"),
        }
    }
}

/// Mutable session root, shared between the session facade and the
/// persistence coordinator behind one mutex
pub(crate) struct SessionState {
    pub activity_id: Option<String>,
    pub mode: WizardMode,
    pub nav: NavigationController,
    pub form_data: FormData,
    pub is_loading: bool,
    pub is_saving: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub has_unsaved_changes: bool,
    /// Bumped on every form mutation; save completions compare against the
    /// revision captured at fire time before clearing the dirty flag
    pub revision: u64,
    pub start_in_flight: bool,
    pub complete_in_flight: bool,
    pub completed: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            activity_id: None,
            mode: WizardMode::Create,
            nav: NavigationController::new(),
            form_data: FormData::new(),
            is_loading: false,
            is_saving: false,
            last_saved_at: None,
            expires_at: None,
            has_unsaved_changes: false,
            revision: 0,
            start_in_flight: false,
            complete_in_flight: false,
            completed: false,
        }
    }

    /// Graph for the currently chosen activity type (migration's graph
    /// while step 1 is unanswered)
    pub fn graph(&self) -> &'static StepGraph {
        graphs::resolve(activity_type_of(&self.form_data))
    }

    /// Snapshot sent over the wire
    pub fn wire_snapshot(&self) -> WizardStateSnapshot {
        WizardStateSnapshot {
            current_step: self.nav.current_step(),
            form_data: self.form_data.clone(),
        }
    }

    /// The id is assigned at most once per session; later assignments are
    /// ignored
    pub fn adopt_activity_id(&mut self, activity_id: &str) {
        if self.activity_id.is_none() {
            self.activity_id = Some(activity_id.to_string());
        }
    }

    /// Apply a successful save acknowledgement. `last_saved_at` is treated
    /// monotonically so a stale autosave response arriving after a newer
    /// explicit save cannot regress the indicator, and the dirty flag is
    /// only cleared when no mutation happened after the write was cut.
    pub fn apply_save_ack(&mut self, ack: &SaveAck, revision_at_fire: u64) {
        if self.last_saved_at.is_none_or(|prev| ack.saved_at >= prev) {
            self.last_saved_at = Some(ack.saved_at);
        }
        if self.mode == WizardMode::Create && !self.completed {
            if let Some(expires_at) = ack.expires_at {
                if self.expires_at.is_none_or(|prev| expires_at >= prev) {
                    self.expires_at = Some(expires_at);
                }
            }
        }
        if self.revision == revision_at_fire {
            self.has_unsaved_changes = false;
        }
    }

    /// Hydrate from a stored wizard snapshot, clamping the stored step
    /// into the hydrated graph's bounds
    pub fn hydrate(&mut self, snapshot: WizardStateSnapshot) {
        self.form_data = snapshot.form_data;
        let graph = self.graph();
        let mut nav = NavigationController::new();
        nav.go_to_step(snapshot.current_step.max(1), graph);
        nav.clamp_to(graph);
        self.nav = nav;
    }

    /// Best-effort reconstruction of step 1 from an entity's top-level
    /// fields, for finalized entities saved without a wizard snapshot
    pub fn synthesize_step_one(&mut self, entity: &Activity) {
        self.form_data = FormData::new();
        self.form_data.insert(
            1,
            StepPayload::BasicInfo(BasicInfoPayload {
                name: entity.name.clone(),
                activity_type: Some(entity.activity_type),
                description: entity.description.clone(),
            }),
        );
    }

    pub fn reset_to_first_step(&mut self) {
        self.nav = NavigationController::new();
    }
}

/// Read-only projection of session state for the rendering layer
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub activity_id: Option<String>,
    pub mode: WizardMode,
    pub current_step: u8,
    pub total_steps: u8,
    pub form_data: FormData,
    pub is_loading: bool,
    pub is_saving: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub has_unsaved_changes: bool,
}

/// One wizard instance: the handle the rendering layer drives.
///
/// Mutating operations are synchronous and non-suspending; suspension
/// happens only inside the persistence operations that talk to the store.
/// Must be used from within a Tokio runtime (autosave scheduling spawns).
pub struct WizardSession {
    state: Arc<Mutex<SessionState>>,
    coordinator: PersistenceCoordinator,
}

pub(crate) fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WizardSession {
    /// Open a fresh create-mode session
    pub fn new(store: Arc<dyn DraftStore>, config: &EngineConfig) -> Self {
        let state = Arc::new(Mutex::new(SessionState::new()));
        let coordinator = PersistenceCoordinator::new(store, state.clone(), &config.autosave);
        Self { state, coordinator }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock_state(&self.state)
    }

    /// The single mutation entry point. Stores the payload, reschedules the
    /// autosave, and triggers draft creation the first time step 1 becomes
    /// valid. Changing the activity type can shrink the graph; the current
    /// step is clamped immediately so the session never points past the end.
    pub fn update_step_data(&self, step: u8, payload: StepPayload) {
        let (needs_start, has_draft) = {
            let mut state = self.lock();
            if state.completed {
                debug!(step, "ignoring mutation after completion");
                return;
            }
            state.form_data.insert(step, payload);
            state.revision += 1;
            state.has_unsaved_changes = true;
            if step == 1 {
                let graph = state.graph();
                state.nav.clamp_to(graph);
            }
            let needs_start = state.mode == WizardMode::Create
                && state.activity_id.is_none()
                && !state.start_in_flight
                && validation::is_step_complete(1, &state.form_data, state.graph());
            // Only drafts autosave; edit-mode changes persist on completion
            let has_draft = state.mode == WizardMode::Create && state.activity_id.is_some();
            (needs_start, has_draft)
        };

        if needs_start {
            let coordinator = self.coordinator.clone();
            tokio::spawn(async move {
                coordinator.start_draft_if_needed().await;
            });
        } else if has_draft {
            self.coordinator.schedule_autosave();
        }
    }

    pub fn current_step(&self) -> u8 {
        self.lock().nav.current_step()
    }

    pub fn can_go_next(&self) -> bool {
        let state = self.lock();
        state.nav.can_go_next(&state.form_data, state.graph())
    }

    pub fn can_go_previous(&self) -> bool {
        self.lock().nav.can_go_previous()
    }

    /// Advance if the current step is complete; a no-op otherwise
    pub fn next_step(&self) -> bool {
        let mut state = self.lock();
        let graph = state.graph();
        let form_data = state.form_data.clone();
        state.nav.next(&form_data, graph)
    }

    /// Retreat; never validation-gated
    pub fn previous_step(&self) -> bool {
        self.lock().nav.previous()
    }

    /// Jump anywhere in range, regardless of intermediate completeness
    pub fn go_to_step(&self, step: u8) -> bool {
        let mut state = self.lock();
        let graph = state.graph();
        state.nav.go_to_step(step, graph)
    }

    /// Is the given step complete right now?
    pub fn validate_step(&self, step: u8) -> bool {
        let state = self.lock();
        validation::is_step_complete(step, &state.form_data, state.graph())
    }

    /// Progress view for indicator rendering
    pub fn step_completion(&self) -> Vec<StepInfo> {
        let state = self.lock();
        validation::step_completion(&state.form_data, state.graph(), state.nav.current_step())
    }

    /// Read-only snapshot of the session for rendering
    pub fn view(&self) -> WizardView {
        let state = self.lock();
        WizardView {
            activity_id: state.activity_id.clone(),
            mode: state.mode,
            current_step: state.nav.current_step(),
            total_steps: state.graph().total_steps(),
            form_data: state.form_data.clone(),
            is_loading: state.is_loading,
            is_saving: state.is_saving,
            last_saved_at: state.last_saved_at,
            expires_at: state.expires_at,
            has_unsaved_changes: state.has_unsaved_changes,
        }
    }

    /// Explicit save; supersedes any pending autosave and propagates
    /// failures for a retry affordance
    pub async fn save_progress(&self) -> Result<(), WizardError> {
        self.coordinator.save_progress().await
    }

    /// Resume a create-mode draft by id
    pub async fn resume_draft(&self, activity_id: &str) -> Result<(), WizardError> {
        self.coordinator.resume_draft(activity_id).await
    }

    /// Load a finalized entity for editing
    pub async fn load_existing(&self, activity_id: &str) -> Result<(), WizardError> {
        self.coordinator.load_existing(activity_id).await
    }

    /// Submit the wizard: convert the draft (create) or commit the edits
    /// (edit). At most one completion ever succeeds per session.
    pub async fn complete(&self) -> Result<Activity, WizardError> {
        self.coordinator.complete().await
    }

    /// Register a callback fired exactly once on successful completion
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&Activity) + Send + 'static,
    {
        self.coordinator
            .set_on_complete(Box::new(callback) as CompletionCallback);
    }

    /// Deterministic teardown: no autosave fires against a closed session
    pub fn close(&self) {
        self.coordinator.cancel_autosave();
    }

    #[cfg(test)]
    pub(crate) fn autosave_pending(&self) -> bool {
        self.coordinator.autosave_pending()
    }
}

impl Drop for WizardSession {
    fn drop(&mut self) {
        self.coordinator.cancel_autosave();
    }
}
