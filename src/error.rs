//! Engine-level error types.
//!
//! Validation blocks are not errors; they are boolean gates on navigation.
//! Everything here is either dropped after logging (autosave) or surfaced
//! to the caller for user-driven recovery. Nothing is fatal to the host.

use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced by the wizard session
#[derive(Debug, Error)]
pub enum WizardError {
    /// Explicit save or completion attempted before a draft exists
    #[error("no draft exists yet; step 1 must be completed first")]
    NoActivityId,

    /// A completion transaction is already in flight
    #[error("completion is already in flight")]
    CompletionInFlight,

    /// The wizard already completed successfully
    #[error("wizard has already been completed")]
    AlreadyCompleted,

    /// The operation is only valid in the other mode
    #[error("operation not valid in {mode} mode")]
    WrongMode { mode: &'static str },

    /// Store interaction failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WizardError {
    /// Is this the distinguished expired-draft failure? Callers use this to
    /// present "this draft has expired" instead of a generic retry prompt.
    pub fn is_expired_draft(&self) -> bool {
        matches!(self, WizardError::Store(e) if e.is_expired())
    }

    /// Is this an edit-mode load against a missing entity?
    pub fn is_not_found(&self) -> bool {
        matches!(self, WizardError::Store(e) if e.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_draft_is_distinguishable() {
        let err = WizardError::from(StoreError::expired("act-1"));
        assert!(err.is_expired_draft());
        assert!(!err.is_not_found());

        let err = WizardError::from(StoreError::network("reset"));
        assert!(!err.is_expired_draft());

        assert!(!WizardError::NoActivityId.is_expired_draft());
    }

    #[test]
    fn test_store_error_display_passes_through() {
        let err = WizardError::from(StoreError::expired("act-7"));
        assert_eq!(err.to_string(), "draft act-7 has expired");
    }
}
