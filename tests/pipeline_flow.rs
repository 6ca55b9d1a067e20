use std::sync::Arc;

use cadence_agent::workflow::templates;
use cadence_agent::{
    approve_module_step, complete_workflow_step, detect_workflow, execute_workflow_step,
    process_module_step, AgentDataContext, Severity, StepStatus,
};
use cadence_core::config::CadenceConfig;
use cadence_core::package::StageOutput;
use cadence_core::stage::StageId;
use cadence_core::types::PipelineEvent;
use cadence_test_utils::fixtures;

#[test]
fn test_customer_priority_walkthrough() {
    let mut wf = detect_workflow("Who should be my priority customers?").expect("workflow detected");
    assert_eq!(wf.id, templates::CUSTOMER_PRIORITY);

    for index in 0..wf.len() {
        wf = execute_workflow_step(&wf, index);
        assert_eq!(wf.steps[index].status, StepStatus::Active);
        wf = if wf.requires_review(index) {
            let reviewing = process_module_step(&wf, index);
            assert_eq!(reviewing.steps[index].status, StepStatus::Review);
            approve_module_step(&reviewing, index, Some(serde_json::json!("hybrid")))
        } else {
            complete_workflow_step(&wf, index)
        };
    }

    assert!(wf.is_complete());
    assert!(wf.steps.iter().all(|s| s.status.is_terminal()));
    let approved: Vec<_> = wf
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Approved)
        .collect();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].module.as_deref(), Some("microsegmentation"));
    assert_eq!(approved[0].user_input, Some(serde_json::json!("hybrid")));

    // The registry copy is untouched.
    let fresh = templates::start_workflow(templates::CUSTOMER_PRIORITY).expect("template");
    assert!(fresh.steps.iter().all(|s| s.status == StepStatus::Pending));
}

#[test]
fn test_pipeline_publishes_in_order() {
    let ctx = AgentDataContext::new(&CadenceConfig::default());

    for stage in StageId::ALL {
        assert!(ctx.is_data_available(stage), "{stage} not ready before publish");
        ctx.update_agent_data(stage, fixtures::output_for(stage))
            .expect("update stage");
    }

    let events = ctx.data_flow_events();
    assert_eq!(events.len(), 6);
    for (event, stage) in events.iter().zip(StageId::ALL) {
        assert_eq!(event.from, stage);
        assert_eq!(event.to, stage.successor());
    }
    assert_eq!(ctx.snapshot().len(), 6);
}

#[test]
fn test_replay_lines_parse_as_stage_outputs() {
    let ctx = AgentDataContext::default();
    for line in fixtures::replay_lines().lines() {
        let output: StageOutput = serde_json::from_str(line).expect("valid replay line");
        ctx.update_agent_data(output.stage(), output).expect("update stage");
    }
    assert!(ctx.readiness().into_iter().all(|(_, ready)| ready));

    let budget = ctx.get_agent_data(StageId::BudgetPlanning).expect("budget data");
    match budget.output {
        StageOutput::BudgetPlanning(data) => assert_eq!(data.planning_horizon_weeks, 13),
        other => panic!("unexpected output: {other:?}"),
    }
}

#[test]
fn test_event_log_bounded_across_repeated_runs() {
    let ctx = AgentDataContext::default();
    for _ in 0..3 {
        for stage in StageId::ALL {
            ctx.update_agent_data(stage, fixtures::output_for(stage))
                .expect("update stage");
        }
    }
    let events = ctx.data_flow_events();
    assert_eq!(events.len(), 10);
    assert_eq!(events.last().map(|e| e.from), Some(StageId::FieldCopilot));
    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_impact_preview_after_budget_change() {
    let ctx = AgentDataContext::default();
    ctx.update_agent_data(StageId::BudgetPlanning, fixtures::output_for(StageId::BudgetPlanning))
        .expect("update stage");

    let impact = ctx.get_downstream_impact(
        StageId::BudgetPlanning,
        &serde_json::json!({ "total_budget": 1_500_000 }),
    );
    let stages: Vec<_> = impact.keys().copied().collect();
    assert_eq!(
        stages,
        vec![
            StageId::ContentReview,
            StageId::Orchestration,
            StageId::FieldSuggestions,
            StageId::FieldCopilot
        ]
    );
    assert_eq!(impact[&StageId::FieldSuggestions].severity, Severity::High);
    assert_eq!(impact[&StageId::FieldCopilot].severity, Severity::Medium);
    assert!(impact.values().all(|i| i.affected));
    assert_eq!(ctx.data_flow_events().len(), 1);
}

#[tokio::test]
async fn test_subscriber_task_observes_updates() {
    let ctx = Arc::new(AgentDataContext::default());
    let mut rx = ctx.subscribe();

    let writer = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            ctx.update_agent_data(
                StageId::CustomerPlanning,
                fixtures::output_for(StageId::CustomerPlanning),
            )
        })
    };
    writer.await.expect("join").expect("update stage");

    let mut flows = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let PipelineEvent::DataFlow(e) = event {
            flows.push((e.from, e.to));
        }
    }
    assert_eq!(flows, vec![(StageId::CustomerPlanning, StageId::BudgetPlanning)]);
}
