use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cadence_core::stage::StageId;

/// Status of a single workflow step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not yet reached.
    #[default]
    Pending,
    /// Currently being worked.
    Active,
    /// Finished without a human gate.
    Completed,
    /// Waiting for human approval.
    Review,
    /// Confirmed by a human.
    Approved,
}

impl StepStatus {
    /// Completed or approved.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Review => "review",
            Self::Approved => "approved",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work within a workflow, owned by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub agent: StageId,
    pub action: String,
    #[serde(default)]
    pub status: StepStatus,
    /// Sub-phase within the owning stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Display metadata: tools used, produced options, summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Rationale trace. Display-only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl WorkflowStep {
    pub fn new(agent: StageId, action: impl Into<String>) -> Self {
        Self {
            agent,
            action: action.into(),
            status: StepStatus::Pending,
            module: None,
            data: None,
            reasoning: vec![],
            user_input: None,
            output: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_reasoning<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reasoning = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Whether this step produces a decision that needs human judgment.
    ///
    /// A module step whose data offers `options` is review-gated.
    pub fn requires_review(&self) -> bool {
        self.module.is_some()
            && self
                .data
                .as_ref()
                .and_then(|d| d.get("options"))
                .is_some_and(|o| o.as_array().is_some_and(|a| !a.is_empty()))
    }
}

/// An ordered sequence of steps representing one end-to-end scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Phrase that selects this workflow.
    pub trigger: String,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub current_step: usize,
    /// Threaded through untouched by the state machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_context: Option<BTreeMap<String, String>>,
}

impl Workflow {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        trigger: impl Into<String>,
        steps: Vec<WorkflowStep>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            trigger: trigger.into(),
            steps,
            current_step: 0,
            brand_context: None,
        }
    }

    /// Attach brand context. An empty map clears it.
    pub fn with_brand_context(mut self, context: BTreeMap<String, String>) -> Self {
        self.brand_context = (!context.is_empty()).then_some(context);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step at `current_step`.
    pub fn current(&self) -> Option<&WorkflowStep> {
        self.steps.get(self.current_step)
    }

    /// Last step reached a terminal status.
    pub fn is_complete(&self) -> bool {
        self.steps.last().is_some_and(|s| s.status.is_terminal())
    }

    /// Fraction of steps in a terminal status (0.0 to 1.0).
    pub fn progress(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        let done = self.steps.iter().filter(|s| s.status.is_terminal()).count();
        done as f64 / self.steps.len() as f64
    }

    /// Indices of the steps owned by `stage`.
    pub fn steps_for(&self, stage: StageId) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.agent == stage)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn requires_review(&self, index: usize) -> bool {
        self.steps.get(index).is_some_and(WorkflowStep::requires_review)
    }

    /// Steps currently waiting on a human.
    pub fn pending_reviews(&self) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status == StepStatus::Review)
            .map(|(i, _)| i)
            .collect()
    }
}
