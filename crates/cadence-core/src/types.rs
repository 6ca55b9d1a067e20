use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::package::StageOutput;
use crate::stage::StageId;

/// The latest output stored for a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    pub stage: StageId,
    pub output: StageOutput,
    pub updated_at: DateTime<Utc>,
}

impl AgentData {
    pub fn new(output: StageOutput) -> Self {
        Self {
            stage: output.stage(),
            output,
            updated_at: Utc::now(),
        }
    }
}

/// Immutable record of data moving from one stage to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFlowEvent {
    pub id: String,
    pub from: StageId,
    pub to: StageId,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl DataFlowEvent {
    pub fn new(from: StageId, to: StageId, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from,
            to,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Whether the event follows a declared stage-to-stage edge.
    pub fn is_adjacent(&self) -> bool {
        self.from.is_adjacent_to(self.to)
    }
}

/// Event broadcast to every context subscriber.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A stage stored new output.
    StageUpdated { stage: StageId, updated_at: DateTime<Utc> },
    /// A data-flow event was appended to the log.
    DataFlow(DataFlowEvent),
    /// The data-flow log was cleared.
    DataFlowCleared,
    /// All stored outputs and events were dropped.
    ContextReset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_flow_event_ids_are_unique() {
        let a = DataFlowEvent::new(StageId::CustomerPlanning, StageId::BudgetPlanning, serde_json::json!({}));
        let b = DataFlowEvent::new(StageId::CustomerPlanning, StageId::BudgetPlanning, serde_json::json!({}));
        assert_ne!(a.id, b.id);
        assert!(a.is_adjacent());
    }

    #[test]
    fn test_non_adjacent_event() {
        let e = DataFlowEvent::new(StageId::CustomerPlanning, StageId::FieldCopilot, serde_json::Value::Null);
        assert!(!e.is_adjacent());
    }
}
