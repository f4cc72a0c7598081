//! Bounded step navigation state machine.
//!
//! State is a single integer in `[1, total_steps]`. Forward movement is
//! gated by validation; backward movement never is. Illegal transitions are
//! no-ops, not failures, so the UI can call optimistically.

use crate::activity::FormData;
use crate::graphs::StepGraph;
use crate::validation;

/// Tracks the current step for one wizard session
#[derive(Debug, Clone)]
pub struct NavigationController {
    current_step: u8,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationController {
    /// Start at step 1
    pub fn new() -> Self {
        Self { current_step: 1 }
    }

    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    /// Can the session advance? Requires room ahead and a complete
    /// current step.
    pub fn can_go_next(&self, form_data: &FormData, graph: &StepGraph) -> bool {
        self.current_step < graph.total_steps()
            && validation::is_step_complete(self.current_step, form_data, graph)
    }

    /// Can the session retreat? Never validation-gated.
    pub fn can_go_previous(&self) -> bool {
        self.current_step > 1
    }

    /// Advance one step. Returns false (and stays put) when the current
    /// step is incomplete or already at the end.
    pub fn next(&mut self, form_data: &FormData, graph: &StepGraph) -> bool {
        if self.can_go_next(form_data, graph) {
            self.current_step += 1;
            true
        } else {
            false
        }
    }

    /// Retreat one step. Returns false at step 1.
    pub fn previous(&mut self) -> bool {
        if self.can_go_previous() {
            self.current_step -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to an arbitrary in-range step, regardless of intermediate
    /// completeness. Supports review-page "Edit" links and progress-node
    /// clicks. Out-of-range targets are rejected with no state change.
    pub fn go_to_step(&mut self, step: u8, graph: &StepGraph) -> bool {
        if (1..=graph.total_steps()).contains(&step) {
            self.current_step = step;
            true
        } else {
            false
        }
    }

    /// Clamp the current step into the bounds of a (possibly smaller)
    /// graph. Changing the activity type mid-session can shrink the graph
    /// below the parked position; the session must never point at a step
    /// that no longer exists.
    pub fn clamp_to(&mut self, graph: &StepGraph) {
        let total = graph.total_steps().max(1);
        if self.current_step > total {
            self.current_step = total;
        }
        if self.current_step < 1 {
            self.current_step = 1;
        }
    }
}
