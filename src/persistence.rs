//! Draft persistence lifecycle: creation, debounced autosave, explicit
//! save, resume, edit-mode load, and completion.
//!
//! All asynchronous interaction with the remote store lives here. The
//! coordinator reads the shared session snapshot but never mutates form
//! data; the session's UI-facing entry point is the only writer, so there
//! are no client-side write/write races.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::activity::StepPayload;
use crate::config::AutosaveConfig;
use crate::error::WizardError;
use crate::session::{lock_state, SessionState, WizardMode};
use crate::store::{Activity, ActivityPatch, DraftStore};
use crate::validation;

/// Callback fired exactly once when completion succeeds
pub type CompletionCallback = Box<dyn FnOnce(&Activity) + Send>;

/// Single-slot cancellable debounce timer.
///
/// Every `schedule` cancels the pending slot and starts a fresh quiet
/// period, so at most one fire is ever outstanding. Built on `tokio::time`,
/// which lets tests drive it with paused time instead of wall-clock waits.
pub struct DebounceTimer {
    quiet_period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            handle: None,
        }
    }

    /// Replace any pending slot with a new one firing after the quiet period
    pub fn schedule<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let quiet_period = self.quiet_period;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            future.await;
        }));
    }

    /// Cancel the pending slot, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Owns all store interaction for one wizard session
#[derive(Clone)]
pub struct PersistenceCoordinator {
    store: Arc<dyn DraftStore>,
    state: Arc<Mutex<SessionState>>,
    timer: Arc<Mutex<DebounceTimer>>,
    on_complete: Arc<Mutex<Option<CompletionCallback>>>,
    autosave_enabled: bool,
}

impl PersistenceCoordinator {
    pub(crate) fn new(
        store: Arc<dyn DraftStore>,
        state: Arc<Mutex<SessionState>>,
        autosave: &AutosaveConfig,
    ) -> Self {
        Self {
            store,
            state,
            timer: Arc::new(Mutex::new(DebounceTimer::new(autosave.quiet_period()))),
            on_complete: Arc::new(Mutex::new(None)),
            autosave_enabled: autosave.enabled,
        }
    }

    pub(crate) fn set_on_complete(&self, callback: CompletionCallback) {
        *lock_mutex(&self.on_complete) = Some(callback);
    }

    /// (Re)schedule the debounced autosave. Every call resets the quiet
    /// period; only the last schedule within it produces a write.
    pub(crate) fn schedule_autosave(&self) {
        if !self.autosave_enabled {
            return;
        }
        let coordinator = self.clone();
        lock_mutex(&self.timer).schedule(async move {
            coordinator.autosave_fire().await;
        });
    }

    /// Cancel any pending autosave. Called before explicit saves and
    /// completion, and on session teardown.
    pub(crate) fn cancel_autosave(&self) {
        lock_mutex(&self.timer).cancel();
    }

    #[cfg(test)]
    pub(crate) fn autosave_pending(&self) -> bool {
        lock_mutex(&self.timer).is_pending()
    }

    /// The write serializes the snapshot as it is *now*, not as it was
    /// when the timer was scheduled, so the latest edits are never lost to
    /// a stale closure. Failures are logged and dropped; the next mutation
    /// or an explicit save is the retry path.
    async fn autosave_fire(&self) {
        let (activity_id, snapshot, revision) = {
            let mut state = lock_state(&self.state);
            let Some(activity_id) = state.activity_id.clone() else {
                return;
            };
            if state.completed {
                return;
            }
            state.is_saving = true;
            (activity_id, state.wire_snapshot(), state.revision)
        };

        let result = self.store.save_progress(&activity_id, &snapshot).await;
        let mut state = lock_state(&self.state);
        state.is_saving = false;
        match result {
            Ok(ack) => {
                debug!(activity_id = %activity_id, "autosave succeeded");
                state.apply_save_ack(&ack, revision);
            }
            Err(e) => {
                // Best-effort: never interrupts the user
                warn!(activity_id = %activity_id, error = %e, "autosave failed, dropping");
            }
        }
    }

    /// Explicit, user-triggered save. Cancels the pending autosave first so
    /// two writes are never in flight, then propagates failures for a
    /// user-visible retry affordance.
    pub(crate) async fn save_progress(&self) -> Result<(), WizardError> {
        self.cancel_autosave();

        let (activity_id, snapshot, revision) = {
            let mut state = lock_state(&self.state);
            if state.mode != WizardMode::Create {
                return Err(WizardError::WrongMode { mode: "edit" });
            }
            let Some(activity_id) = state.activity_id.clone() else {
                return Err(WizardError::NoActivityId);
            };
            state.is_saving = true;
            (activity_id, state.wire_snapshot(), state.revision)
        };

        let result = self.store.save_progress(&activity_id, &snapshot).await;
        let mut state = lock_state(&self.state);
        state.is_saving = false;
        let ack = result?;
        state.apply_save_ack(&ack, revision);
        Ok(())
    }

    /// Create the draft the first time step 1 becomes valid. At most once
    /// per session; a failure is logged without automatic retry, leaving a
    /// later mutation to re-trigger the same condition.
    pub(crate) async fn start_draft_if_needed(&self) {
        let (name, activity_type) = {
            let mut state = lock_state(&self.state);
            if state.mode != WizardMode::Create
                || state.activity_id.is_some()
                || state.start_in_flight
            {
                return;
            }
            if !validation::is_step_complete(1, &state.form_data, state.graph()) {
                return;
            }
            let Some(StepPayload::BasicInfo(info)) = state.form_data.get(&1) else {
                return;
            };
            let Some(activity_type) = info.activity_type else {
                return;
            };
            let name = info.name.clone();
            state.start_in_flight = true;
            (name, activity_type)
        };

        let result = self.store.start(&name, activity_type).await;
        let mut state = lock_state(&self.state);
        state.start_in_flight = false;
        match result {
            Ok(handle) => {
                info!(activity_id = %handle.activity_id, "draft created");
                state.adopt_activity_id(&handle.activity_id);
                state.expires_at = Some(handle.expires_at);
                drop(state);
                // Persist what the user has typed so far
                self.schedule_autosave();
            }
            Err(e) => {
                warn!(error = %e, "draft creation failed; will retry on a later mutation");
            }
        }
    }

    /// Load a draft by id and hydrate the session from it. An expired
    /// draft surfaces the distinguished expired failure.
    pub(crate) async fn resume_draft(&self, activity_id: &str) -> Result<(), WizardError> {
        {
            let mut state = lock_state(&self.state);
            if state.mode != WizardMode::Create {
                return Err(WizardError::WrongMode { mode: "edit" });
            }
            state.is_loading = true;
        }

        let result = self.store.get_draft(activity_id).await;
        let mut state = lock_state(&self.state);
        state.is_loading = false;
        let draft = result?;

        state.adopt_activity_id(activity_id);
        if let Some(wizard_state) = draft.wizard_state {
            state.hydrate(wizard_state);
        }
        state.expires_at = draft.expires_at;
        state.has_unsaved_changes = false;
        info!(activity_id, step = state.nav.current_step(), "draft resumed");
        Ok(())
    }

    /// Load a finalized entity for edit mode. Hydrates from the stored
    /// wizard snapshot when present, otherwise synthesizes a step-1 payload
    /// from the entity's top-level fields. Always lands on step 1 with no
    /// expiry (finalized entities never expire).
    pub(crate) async fn load_existing(&self, activity_id: &str) -> Result<(), WizardError> {
        {
            let mut state = lock_state(&self.state);
            state.mode = WizardMode::Edit;
            state.is_loading = true;
        }

        let result = self.store.get_entity(activity_id).await;
        let mut state = lock_state(&self.state);
        state.is_loading = false;
        let entity = result?;

        state.adopt_activity_id(activity_id);
        match entity.wizard_state {
            Some(wizard_state) => {
                state.form_data = wizard_state.form_data;
            }
            None => {
                state.synthesize_step_one(&entity);
            }
        }
        state.reset_to_first_step();
        state.expires_at = None;
        state.has_unsaved_changes = false;
        info!(activity_id, "entity loaded for editing");
        Ok(())
    }

    /// Terminal action. Create mode converts the draft into an entity;
    /// edit mode patches the existing one. The engine owns the at-most-once
    /// guard: a second call while one is in flight, or after a success, is
    /// rejected here rather than left to the caller.
    pub(crate) async fn complete(&self) -> Result<Activity, WizardError> {
        self.cancel_autosave();

        let (activity_id, snapshot, mode) = {
            let mut state = lock_state(&self.state);
            if state.completed {
                return Err(WizardError::AlreadyCompleted);
            }
            if state.complete_in_flight {
                return Err(WizardError::CompletionInFlight);
            }
            let Some(activity_id) = state.activity_id.clone() else {
                return Err(WizardError::NoActivityId);
            };
            state.complete_in_flight = true;
            state.is_saving = true;
            (activity_id, state.wire_snapshot(), state.mode)
        };

        let result = match mode {
            WizardMode::Create => self.store.complete_draft(&activity_id, &snapshot).await,
            WizardMode::Edit => {
                let patch = match snapshot.form_data.get(&1) {
                    Some(StepPayload::BasicInfo(info)) => ActivityPatch {
                        name: Some(info.name.clone()),
                        activity_type: info.activity_type,
                        description: info.description.clone(),
                        wizard_state: Some(snapshot.clone()),
                    },
                    _ => ActivityPatch {
                        wizard_state: Some(snapshot.clone()),
                        ..ActivityPatch::default()
                    },
                };
                self.store.update_entity(&activity_id, &patch).await
            }
        };

        let mut state = lock_state(&self.state);
        state.is_saving = false;
        state.complete_in_flight = false;
        match result {
            Ok(entity) => {
                state.completed = true;
                state.has_unsaved_changes = false;
                state.expires_at = None;
                drop(state);
                info!(activity_id = %activity_id, "wizard completed");
                if let Some(callback) = lock_mutex(&self.on_complete).take() {
                    callback(&entity);
                }
                Ok(entity)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Lock a mutex, recovering the guard if a holder panicked
fn lock_mutex<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_debounce_single_slot() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new(Duration::from_secs(30));

        for _ in 0..5 {
            let fired = fired.clone();
            timer.schedule(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_secs(5)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_cancel() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = DebounceTimer::new(Duration::from_secs(30));

        {
            let fired = fired.clone();
            timer.schedule(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(timer.is_pending());
        timer.cancel();
        assert!(!timer.is_pending());

        tokio::time::sleep(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
