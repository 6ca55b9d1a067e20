//! Step transitions.
//!
//! Each transition exists twice: an in-place method on [`Workflow`] that
//! reports whether anything changed, and a free function that leaves its
//! input untouched and returns the transitioned copy. Indices outside the
//! step list are a logged no-op.

use tracing::debug;

use super::step::{StepStatus, Workflow};

impl Workflow {
    fn in_range(&self, index: usize, transition: &str) -> bool {
        let ok = index < self.steps.len();
        if !ok {
            debug!(
                workflow = %self.id,
                index,
                len = self.steps.len(),
                transition,
                "Step index out of range, ignoring transition"
            );
        }
        ok
    }

    /// Move to the step after `index`, if any, and activate it.
    fn advance_from(&mut self, index: usize) {
        let next = index + 1;
        if next < self.steps.len() {
            self.current_step = next;
            self.steps[next].status = StepStatus::Active;
        } else {
            debug!(workflow = %self.id, index, "Final step reached, workflow is terminal");
        }
    }

    /// Activate step `index`, jumping `current_step` to it. Every earlier
    /// step that is not approved is marked completed.
    pub fn execute_step(&mut self, index: usize) -> bool {
        if !self.in_range(index, "execute") {
            return false;
        }
        for step in &mut self.steps[..index] {
            if step.status != StepStatus::Approved {
                step.status = StepStatus::Completed;
            }
        }
        self.steps[index].status = StepStatus::Active;
        self.current_step = index;
        debug!(workflow = %self.id, index, agent = %self.steps[index].agent, "Step active");
        true
    }

    /// Put step `index` into review.
    pub fn process_module_step(&mut self, index: usize) -> bool {
        if !self.in_range(index, "process_module") {
            return false;
        }
        self.steps[index].status = StepStatus::Review;
        debug!(
            workflow = %self.id,
            index,
            module = self.steps[index].module.as_deref().unwrap_or("-"),
            "Step awaiting review"
        );
        true
    }

    /// Approve step `index`, record the reviewer's input, and activate the
    /// next step.
    pub fn approve_module_step(&mut self, index: usize, user_input: Option<serde_json::Value>) -> bool {
        if !self.in_range(index, "approve_module") {
            return false;
        }
        let step = &mut self.steps[index];
        step.status = StepStatus::Approved;
        if user_input.is_some() {
            step.user_input = user_input;
        }
        debug!(workflow = %self.id, index, "Step approved");
        self.advance_from(index);
        true
    }

    /// Complete step `index` and activate the next step.
    pub fn complete_step(&mut self, index: usize) -> bool {
        if !self.in_range(index, "complete") {
            return false;
        }
        self.steps[index].status = StepStatus::Completed;
        debug!(workflow = %self.id, index, "Step completed");
        self.advance_from(index);
        true
    }
}

/// Copy of `workflow` with step `index` active.
pub fn execute_workflow_step(workflow: &Workflow, index: usize) -> Workflow {
    let mut next = workflow.clone();
    next.execute_step(index);
    next
}

/// Copy of `workflow` with step `index` in review.
pub fn process_module_step(workflow: &Workflow, index: usize) -> Workflow {
    let mut next = workflow.clone();
    next.process_module_step(index);
    next
}

/// Copy of `workflow` with step `index` approved.
pub fn approve_module_step(
    workflow: &Workflow,
    index: usize,
    user_input: Option<serde_json::Value>,
) -> Workflow {
    let mut next = workflow.clone();
    next.approve_module_step(index, user_input);
    next
}

/// Copy of `workflow` with step `index` completed.
pub fn complete_workflow_step(workflow: &Workflow, index: usize) -> Workflow {
    let mut next = workflow.clone();
    next.complete_step(index);
    next
}
