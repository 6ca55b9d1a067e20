//! Workflow model, templates, and the step state machine.
//!
//! A workflow is an ordered, fixed-length list of steps, each owned by a
//! pipeline stage. Steps move `pending → active → (review → approved) |
//! completed`; the transitions live in [`machine`] and never touch shared
//! state.

pub mod machine;
pub mod step;
pub mod templates;

pub use machine::{
    approve_module_step, complete_workflow_step, execute_workflow_step, process_module_step,
};
pub use step::{StepStatus, Workflow, WorkflowStep};
pub use templates::{
    detect_budget_reallocation, detect_content_approval, detect_customer_priority,
    detect_workflow, start_workflow, template_ids,
};
