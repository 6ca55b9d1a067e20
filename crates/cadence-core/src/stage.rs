//! Pipeline stages and the static dependency graph between them.
//!
//! The six stages form a fixed forward chain. Each stage requires the output
//! of the stage before it, and the entry stage additionally takes the last
//! stage's output as advisory feedback. Feedback edges never gate
//! availability.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CadenceError;

static PIPELINE: [StageId; 6] = StageId::ALL;

/// One of the six fixed pipeline roles, declared in canonical order.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    CustomerPlanning,
    BudgetPlanning,
    ContentReview,
    Orchestration,
    FieldSuggestions,
    FieldCopilot,
}

impl StageId {
    /// All stages in pipeline order.
    pub const ALL: [StageId; 6] = [
        StageId::CustomerPlanning,
        StageId::BudgetPlanning,
        StageId::ContentReview,
        StageId::Orchestration,
        StageId::FieldSuggestions,
        StageId::FieldCopilot,
    ];

    /// Zero-based position in the pipeline.
    pub fn position(self) -> usize {
        self as usize
    }

    pub fn from_position(position: usize) -> Option<Self> {
        Self::ALL.get(position).copied()
    }

    /// Stable snake_case identifier (matches the serde form).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CustomerPlanning => "customer_planning",
            Self::BudgetPlanning => "budget_planning",
            Self::ContentReview => "content_review",
            Self::Orchestration => "orchestration",
            Self::FieldSuggestions => "field_suggestions",
            Self::FieldCopilot => "field_copilot",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::CustomerPlanning => "Customer Planning",
            Self::BudgetPlanning => "Budget Planning",
            Self::ContentReview => "Content Review",
            Self::Orchestration => "AI Orchestration",
            Self::FieldSuggestions => "Field Suggestions",
            Self::FieldCopilot => "Field Copilot",
        }
    }

    /// Next stage in forward order, `None` for the last stage.
    pub fn next(self) -> Option<Self> {
        Self::from_position(self.position() + 1)
    }

    /// Previous stage in forward order, `None` for the entry stage.
    pub fn previous(self) -> Option<Self> {
        self.position().checked_sub(1).and_then(Self::from_position)
    }

    /// Stage that receives this stage's output, following the feedback edge
    /// from the last stage back to the entry stage.
    pub fn successor(self) -> Self {
        self.next().unwrap_or(Self::CustomerPlanning)
    }

    /// Every stage strictly after this one, in canonical order.
    pub fn downstream(self) -> &'static [StageId] {
        &PIPELINE[self.position() + 1..]
    }

    pub fn is_entry(self) -> bool {
        self.position() == 0
    }

    /// Whether a payload may travel directly from `self` to `to`.
    pub fn is_adjacent_to(self, to: StageId) -> bool {
        self.successor() == to
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        let stage = match normalized.as_str() {
            "customer_planning" | "customer" => Self::CustomerPlanning,
            "budget_planning" | "budget" => Self::BudgetPlanning,
            "content_review" | "content" => Self::ContentReview,
            "orchestration" | "ai_orchestration" => Self::Orchestration,
            "field_suggestions" | "suggestions" => Self::FieldSuggestions,
            "field_copilot" | "copilot" => Self::FieldCopilot,
            _ => return Err(CadenceError::UnknownStage(s.to_string())),
        };
        Ok(stage)
    }
}

/// How a stage consumes one of its upstream dependencies.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Must have produced output before the dependent stage may run.
    Required,
    /// Consumed as context when present; never gates availability.
    Feedback,
}

/// A single declared dependency edge.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub stage: StageId,
    pub kind: DependencyKind,
}

/// Static adjacency list from each stage to the stages it depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyGraph;

impl DependencyGraph {
    /// All declared dependencies for `stage`.
    pub fn dependencies(&self, stage: StageId) -> &'static [Dependency] {
        use DependencyKind::*;
        use StageId::*;

        match stage {
            CustomerPlanning => &[Dependency { stage: FieldCopilot, kind: Feedback }],
            BudgetPlanning => &[Dependency { stage: CustomerPlanning, kind: Required }],
            ContentReview => &[Dependency { stage: BudgetPlanning, kind: Required }],
            Orchestration => &[Dependency { stage: ContentReview, kind: Required }],
            FieldSuggestions => &[Dependency { stage: Orchestration, kind: Required }],
            FieldCopilot => &[Dependency { stage: FieldSuggestions, kind: Required }],
        }
    }

    /// Dependencies that gate whether `stage` can run.
    pub fn required(&self, stage: StageId) -> impl Iterator<Item = StageId> {
        self.dependencies(stage)
            .iter()
            .filter(|d| d.kind == DependencyKind::Required)
            .map(|d| d.stage)
    }

    /// Stages that declare `stage` as a dependency of any kind.
    pub fn dependents(&self, stage: StageId) -> Vec<StageId> {
        StageId::ALL
            .into_iter()
            .filter(|s| self.dependencies(*s).iter().any(|d| d.stage == stage))
            .collect()
    }

    /// Stages with no required dependencies.
    pub fn entry_points(&self) -> Vec<StageId> {
        StageId::ALL
            .into_iter()
            .filter(|s| self.required(*s).next().is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        assert_eq!(StageId::CustomerPlanning.position(), 0);
        assert_eq!(StageId::FieldCopilot.position(), 5);
        assert!(StageId::BudgetPlanning < StageId::ContentReview);
        assert_eq!(StageId::CustomerPlanning.next(), Some(StageId::BudgetPlanning));
        assert_eq!(StageId::FieldCopilot.next(), None);
        assert_eq!(StageId::CustomerPlanning.previous(), None);
    }

    #[test]
    fn test_successor_wraps_to_entry() {
        assert_eq!(StageId::FieldCopilot.successor(), StageId::CustomerPlanning);
        assert!(StageId::FieldCopilot.is_adjacent_to(StageId::CustomerPlanning));
        assert!(!StageId::CustomerPlanning.is_adjacent_to(StageId::ContentReview));
    }

    #[test]
    fn test_downstream_excludes_self_and_earlier() {
        let down = StageId::ContentReview.downstream();
        assert_eq!(
            down,
            &[StageId::Orchestration, StageId::FieldSuggestions, StageId::FieldCopilot]
        );
        assert!(StageId::FieldCopilot.downstream().is_empty());
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("copilot".parse::<StageId>().unwrap(), StageId::FieldCopilot);
        assert_eq!("Budget Planning".parse::<StageId>().unwrap(), StageId::BudgetPlanning);
        assert_eq!("content-review".parse::<StageId>().unwrap(), StageId::ContentReview);
        assert!(matches!(
            "weather".parse::<StageId>(),
            Err(CadenceError::UnknownStage(_))
        ));
    }

    #[test]
    fn test_serde_matches_as_str() {
        for stage in StageId::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }

    #[test]
    fn test_graph_entry_point_is_customer_planning() {
        let graph = DependencyGraph;
        assert_eq!(graph.entry_points(), vec![StageId::CustomerPlanning]);
        assert_eq!(graph.required(StageId::CustomerPlanning).count(), 0);
    }

    #[test]
    fn test_graph_forward_chain() {
        let graph = DependencyGraph;
        for stage in StageId::ALL.into_iter().skip(1) {
            let required: Vec<_> = graph.required(stage).collect();
            assert_eq!(required, vec![stage.previous().unwrap()]);
        }
    }

    #[test]
    fn test_feedback_edge_is_advisory() {
        let graph = DependencyGraph;
        let deps = graph.dependencies(StageId::CustomerPlanning);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].stage, StageId::FieldCopilot);
        assert_eq!(deps[0].kind, DependencyKind::Feedback);
        assert_eq!(graph.dependents(StageId::FieldCopilot), vec![StageId::CustomerPlanning]);
    }
}
