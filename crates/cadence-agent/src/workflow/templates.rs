//! Built-in workflow templates and trigger-phrase detection.
//!
//! Templates are built once and never handed out directly: every lookup
//! returns an owned clone, so a running workflow can never mutate the
//! template another session will start from.

use std::sync::OnceLock;

use serde_json::json;
use tracing::debug;

use cadence_core::stage::StageId;

use super::step::{Workflow, WorkflowStep};

pub const CUSTOMER_PRIORITY: &str = "customer-priority";
pub const CONTENT_APPROVAL: &str = "content-approval";
pub const BUDGET_REALLOCATION: &str = "budget-reallocation";

/// A template plus the heuristic that selects it.
struct TemplateEntry {
    workflow: Workflow,
    matches: fn(&str) -> bool,
}

/// Registry order is detection precedence.
fn registry() -> &'static [TemplateEntry] {
    static REGISTRY: OnceLock<Vec<TemplateEntry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        vec![
            TemplateEntry {
                workflow: customer_priority_template(),
                matches: matches_customer_priority,
            },
            TemplateEntry {
                workflow: content_approval_template(),
                matches: matches_content_approval,
            },
            TemplateEntry {
                workflow: budget_reallocation_template(),
                matches: matches_budget_reallocation,
            },
        ]
    })
}

fn matches_customer_priority(query: &str) -> bool {
    query.contains("priorit") && query.contains("customer")
}

fn matches_content_approval(query: &str) -> bool {
    (query.contains("content") && query.contains("approv"))
        || (query.contains("weekly") && query.contains("ops"))
}

fn matches_budget_reallocation(query: &str) -> bool {
    query.contains("budget")
        && ["realloc", "shift", "optimi"].iter().any(|k| query.contains(k))
}

fn detect_with(id: &str, query: &str) -> Option<Workflow> {
    let q = query.to_lowercase();
    let entry = registry().iter().find(|e| e.workflow.id == id)?;
    (entry.matches)(&q).then(|| entry.workflow.clone())
}

/// Customer prioritization, if the query asks about priority customers.
pub fn detect_customer_priority(query: &str) -> Option<Workflow> {
    detect_with(CUSTOMER_PRIORITY, query)
}

/// Weekly content approval, if the query asks about content approval or weekly ops.
pub fn detect_content_approval(query: &str) -> Option<Workflow> {
    detect_with(CONTENT_APPROVAL, query)
}

/// Budget reallocation, if the query asks to shift or optimize budget.
pub fn detect_budget_reallocation(query: &str) -> Option<Workflow> {
    detect_with(BUDGET_REALLOCATION, query)
}

/// First template whose trigger heuristic matches `query`, in registry order.
pub fn detect_workflow(query: &str) -> Option<Workflow> {
    let q = query.to_lowercase();
    let found = registry()
        .iter()
        .find(|e| (e.matches)(&q))
        .map(|e| e.workflow.clone());
    match &found {
        Some(wf) => debug!(workflow = %wf.id, "Workflow detected"),
        None => debug!("No workflow matched query"),
    }
    found
}

/// Fresh copy of the template with the given id.
pub fn start_workflow(id: &str) -> Option<Workflow> {
    registry()
        .iter()
        .find(|e| e.workflow.id == id)
        .map(|e| e.workflow.clone())
}

/// Ids of every registered template, in precedence order.
pub fn template_ids() -> Vec<&'static str> {
    registry().iter().map(|e| e.workflow.id.as_str()).collect()
}

fn customer_priority_template() -> Workflow {
    Workflow::new(
        CUSTOMER_PRIORITY,
        "Customer Prioritization",
        "Identify and segment priority HCPs, then carry the result through budget, content, orchestration and the field.",
        "Who should be my priority customers?",
        vec![
            WorkflowStep::new(StageId::CustomerPlanning, "Build HCP personas from prescribing and engagement history")
                .with_module("persona")
                .with_data(json!({ "tools": ["claims_analyzer", "engagement_history"] }))
                .with_reasoning([
                    "Group HCPs by specialty, practice setting and adoption stage",
                    "Attach the dominant prescribing barrier to each persona",
                ]),
            WorkflowStep::new(StageId::CustomerPlanning, "Score historical prescribing performance")
                .with_module("performance")
                .with_data(json!({ "tools": ["trx_trend_model"] }))
                .with_reasoning(["Compare 12-month TRx trend against the territory baseline"]),
            WorkflowStep::new(StageId::CustomerPlanning, "Estimate untapped opportunity per HCP")
                .with_module("potential")
                .with_data(json!({ "tools": ["market_sizing", "patient_volume"] }))
                .with_reasoning([
                    "Treatable patient volume sets the ceiling",
                    "Current share of brand sets the gap",
                ]),
            WorkflowStep::new(StageId::CustomerPlanning, "Infer channel and content preferences")
                .with_module("preference")
                .with_data(json!({ "tools": ["channel_affinity"] }))
                .with_reasoning(["Weight recent digital engagement above historical rep visits"]),
            WorkflowStep::new(StageId::CustomerPlanning, "Propose microsegmentation of priority HCPs")
                .with_module("microsegmentation")
                .with_data(json!({
                    "options": [
                        {
                            "id": "barrier-led",
                            "name": "Barrier-led segments",
                            "description": "Group HCPs by their dominant access or clinical barrier",
                            "segments": 5
                        },
                        {
                            "id": "value-led",
                            "name": "Value-led segments",
                            "description": "Group HCPs by opportunity value tier",
                            "segments": 3
                        },
                        {
                            "id": "hybrid",
                            "name": "Hybrid segments",
                            "description": "Value tiers split by dominant barrier",
                            "segments": 8
                        }
                    ]
                }))
                .with_reasoning([
                    "Segment count trades targeting precision against content production cost",
                    "A reviewer picks the scheme before budget is allocated",
                ]),
            WorkflowStep::new(StageId::BudgetPlanning, "Allocate budget across prioritized segments")
                .with_output(json!({ "channels": 5, "allocation_basis": "segment_opportunity" })),
            WorkflowStep::new(StageId::ContentReview, "Match approved content to segment barriers"),
            WorkflowStep::new(StageId::Orchestration, "Sequence next-best actions per HCP"),
            WorkflowStep::new(StageId::FieldSuggestions, "Generate field suggestions for priority HCPs"),
            WorkflowStep::new(StageId::FieldCopilot, "Brief field representatives on the new priorities"),
        ],
    )
}

fn content_approval_template() -> Workflow {
    Workflow::new(
        CONTENT_APPROVAL,
        "Weekly Content Approval",
        "Weekly operations run: review submitted assets, approve them, and push the result to orchestration and the field.",
        "Run weekly ops for content approval",
        vec![
            WorkflowStep::new(StageId::ContentReview, "Collect assets submitted this week")
                .with_module("intake")
                .with_data(json!({ "tools": ["asset_library"] })),
            WorkflowStep::new(StageId::ContentReview, "Pre-check assets for medical, legal and regulatory compliance")
                .with_module("compliance")
                .with_data(json!({
                    "options": [
                        { "id": "approve-passing", "name": "Approve all passing assets" },
                        { "id": "hold-flagged", "name": "Approve passing, hold flagged for revision" },
                        { "id": "hold-all", "name": "Hold the batch for full committee review" }
                    ]
                }))
                .with_reasoning([
                    "Claims without a cited reference are flagged",
                    "Fair-balance checks run on every promotional asset",
                ]),
            WorkflowStep::new(StageId::ContentReview, "Publish approved assets to the content library")
                .with_output(json!({ "published": 0 })),
            WorkflowStep::new(StageId::Orchestration, "Refresh orchestration sequences with new assets"),
            WorkflowStep::new(StageId::FieldSuggestions, "Notify field teams of newly available content"),
        ],
    )
}

fn budget_reallocation_template() -> Workflow {
    Workflow::new(
        BUDGET_REALLOCATION,
        "Budget Reallocation",
        "Model alternative channel spend and rebalance downstream plans around the chosen scenario.",
        "Shift budget toward the best performing channels",
        vec![
            WorkflowStep::new(StageId::BudgetPlanning, "Model spend scenarios by channel")
                .with_module("scenario")
                .with_data(json!({ "tools": ["roi_curve_model"] }))
                .with_reasoning(["Response curves flatten past the current digital spend level"]),
            WorkflowStep::new(StageId::BudgetPlanning, "Propose a reallocation")
                .with_module("reallocation")
                .with_data(json!({
                    "options": [
                        { "id": "digital-shift", "name": "Shift 10% from in-person to digital" },
                        { "id": "speaker-boost", "name": "Fund two additional speaker programs" },
                        { "id": "hold", "name": "Keep the current allocation" }
                    ]
                })),
            WorkflowStep::new(StageId::ContentReview, "Adjust the content production plan to the new allocation"),
            WorkflowStep::new(StageId::Orchestration, "Rebalance channel mix in orchestration"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::step::StepStatus;

    #[test]
    fn test_detect_customer_priority() {
        let wf = detect_workflow("Who should be my priority customers?").unwrap();
        assert_eq!(wf.id, CUSTOMER_PRIORITY);
        assert_eq!(wf.current_step, 0);
        assert!(wf.steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[test]
    fn test_detect_content_approval() {
        let wf = detect_workflow("run weekly ops for content approval").unwrap();
        assert_eq!(wf.id, CONTENT_APPROVAL);
        assert!(detect_content_approval("Kick off WEEKLY OPS").is_some());
    }

    #[test]
    fn test_detect_miss() {
        assert!(detect_workflow("what's the weather").is_none());
        assert!(detect_customer_priority("customers only").is_none());
    }

    #[test]
    fn test_detect_budget_reallocation() {
        let wf = detect_workflow("Can we reallocate budget to digital?").unwrap();
        assert_eq!(wf.id, BUDGET_REALLOCATION);
    }

    #[test]
    fn test_ambiguous_query_uses_registry_order() {
        let query = "prioritize customers, then run content approval";
        assert!(detect_customer_priority(query).is_some());
        assert!(detect_content_approval(query).is_some());
        assert_eq!(detect_workflow(query).unwrap().id, CUSTOMER_PRIORITY);
    }

    #[test]
    fn test_detected_copy_is_independent() {
        let mut first = detect_customer_priority("priority customers").unwrap();
        first.steps[4].data = None;
        first.steps[0].reasoning.push("mutated".into());
        first.execute_step(3);

        let second = detect_customer_priority("priority customers").unwrap();
        assert!(second.steps[4].data.is_some());
        assert_eq!(second.steps[0].reasoning.len(), 2);
        assert_eq!(second.current_step, 0);
    }

    #[test]
    fn test_customer_priority_modules_in_order() {
        let wf = start_workflow(CUSTOMER_PRIORITY).unwrap();
        let modules: Vec<_> = wf.steps.iter().filter_map(|s| s.module.as_deref()).collect();
        assert_eq!(
            modules,
            vec!["persona", "performance", "potential", "preference", "microsegmentation"]
        );
        assert!(wf.requires_review(4));
        assert!(!wf.requires_review(0));
        for stage in StageId::ALL {
            assert!(!wf.steps_for(stage).is_empty(), "no step for {stage}");
        }
    }

    #[test]
    fn test_start_unknown_template() {
        assert!(start_workflow("nope").is_none());
        assert_eq!(
            template_ids(),
            vec![CUSTOMER_PRIORITY, CONTENT_APPROVAL, BUDGET_REALLOCATION]
        );
    }
}
