//! Migration Wizard - activity-type-driven creation wizard engine
//!
//! The engine behind the multi-step activity creation flow in the
//! infrastructure-migration planner. It resolves the step graph for a chosen
//! activity type, gates navigation on per-step validation, and owns the
//! draft persistence lifecycle (debounced autosave, explicit save, resume,
//! expiry, completion) against a remote draft/entity store.
//!
//! Rendering is out of scope: the UI layer receives a [`WizardSession`]
//! handle and drives it through the operations re-exported below.

pub mod activity;
pub mod config;
pub mod error;
pub mod graphs;
pub mod logging;
pub mod navigation;
pub mod persistence;
pub mod session;
pub mod store;
pub mod validation;

pub use activity::{ActivityType, FormData, StepPayload};
pub use config::EngineConfig;
pub use error::WizardError;
pub use graphs::{resolve, StepGraph, StepHandler};
pub use session::{WizardMode, WizardSession, WizardView};
pub use store::{DraftStore, HttpDraftStore, MemoryDraftStore, StoreError};
pub use validation::StepInfo;
