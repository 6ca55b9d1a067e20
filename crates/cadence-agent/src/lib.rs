pub mod context;
pub mod impact;
pub mod workflow;

pub use context::AgentDataContext;
pub use impact::{estimate_downstream_impact, ImpactEstimator, Severity, StageImpact};
pub use workflow::{
    approve_module_step, complete_workflow_step, detect_workflow, execute_workflow_step,
    process_module_step, start_workflow, StepStatus, Workflow, WorkflowStep,
};
