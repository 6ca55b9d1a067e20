//! Shared fixtures for Cadence tests.

pub mod fixtures {
    use std::collections::BTreeMap;

    use cadence_core::package::*;
    use cadence_core::stage::StageId;

    pub fn customer_to_budget() -> CustomerToBudgetData {
        CustomerToBudgetData {
            prioritized_hcps: vec![
                PrioritizedHcp {
                    id: "hcp-001".into(),
                    name: "Dr. Amara Okafor".into(),
                    specialty: "Cardiology".into(),
                    tier: HcpTier::A,
                    opportunity_score: 94.0,
                    primary_barrier: Some(BarrierCategory::PriorAuthorization),
                },
                PrioritizedHcp {
                    id: "hcp-002".into(),
                    name: "Dr. Lena Ström".into(),
                    specialty: "Internal Medicine".into(),
                    tier: HcpTier::B,
                    opportunity_score: 71.5,
                    primary_barrier: Some(BarrierCategory::ClinicalInertia),
                },
            ],
            barrier_analysis: BarrierAnalysis {
                formulary_access: 0.24,
                prior_authorization: 0.30,
                clinical_inertia: 0.21,
                safety_concerns: 0.10,
                cost_burden: 0.15,
            },
            engagement_recommendations: ChannelCounts {
                in_person: 48,
                virtual_visit: 22,
                email: 75,
                speaker_program: 6,
                digital: 40,
            },
            total_opportunity_value: 3_850_000.0,
            segments: vec![
                Segment {
                    name: "Access-constrained loyalists".into(),
                    size: 84,
                    avg_opportunity: 28_500.0,
                },
                Segment {
                    name: "Evidence seekers".into(),
                    size: 132,
                    avg_opportunity: 12_200.0,
                },
            ],
        }
    }

    pub fn budget_to_content() -> BudgetToContentData {
        BudgetToContentData {
            total_budget: 1_200_000.0,
            channel_allocations: vec![
                ChannelAllocation { channel: "in_person".into(), amount: 540_000.0, share: 0.45 },
                ChannelAllocation { channel: "digital".into(), amount: 420_000.0, share: 0.35 },
                ChannelAllocation { channel: "speaker_program".into(), amount: 240_000.0, share: 0.20 },
            ],
            content_requirements: vec![
                ContentRequirement {
                    channel: "digital".into(),
                    theme: "Prior authorization support".into(),
                    quantity: 4,
                    priority: Priority::High,
                },
                ContentRequirement {
                    channel: "email".into(),
                    theme: "Long-term outcomes data".into(),
                    quantity: 2,
                    priority: Priority::Medium,
                },
            ],
            expected_roi: 3.4,
            planning_horizon_weeks: 13,
        }
    }

    pub fn content_to_orchestration() -> ContentToOrchestrationData {
        ContentToOrchestrationData {
            approved_assets: vec![
                ApprovedAsset {
                    id: "asset-101".into(),
                    title: "PA Navigator leave-behind".into(),
                    channel: "in_person".into(),
                    theme: "Prior authorization support".into(),
                    compliance_score: 0.97,
                },
                ApprovedAsset {
                    id: "asset-102".into(),
                    title: "Five-year outcomes email".into(),
                    channel: "email".into(),
                    theme: "Long-term outcomes data".into(),
                    compliance_score: 0.93,
                },
            ],
            pending_review: 3,
            rejected: 1,
            average_review_days: 4.5,
        }
    }

    pub fn orchestration_to_suggestions() -> OrchestrationToSuggestionsData {
        let mut journey = BTreeMap::new();
        journey.insert("awareness".to_string(), 120);
        journey.insert("trial".to_string(), 64);
        journey.insert("adoption".to_string(), 32);
        OrchestrationToSuggestionsData {
            model_performance: ModelPerformance {
                accuracy: 0.86,
                precision: 0.81,
                recall: 0.78,
            },
            next_best_actions: vec![NextBestAction {
                hcp_id: "hcp-001".into(),
                channel: "in_person".into(),
                content_id: "asset-101".into(),
                recommended_day: "tuesday".into(),
                confidence: 0.88,
            }],
            journey_distribution: journey,
        }
    }

    pub fn suggestions_to_copilot() -> SuggestionsToCopilotData {
        let mut triggers = BTreeMap::new();
        triggers.insert("formulary_change".to_string(), 2);
        triggers.insert("rx_decline".to_string(), 1);
        SuggestionsToCopilotData {
            suggestions: vec![FieldSuggestion {
                id: "sug-1".into(),
                hcp_id: "hcp-001".into(),
                priority: Priority::High,
                action: "Walk through the PA Navigator at the next visit".into(),
                rationale: "Prior authorization is this HCP's dominant barrier".into(),
                trigger: "formulary_change".into(),
            }],
            trigger_counts: triggers,
            acceptance_rate: 0.62,
        }
    }

    pub fn copilot_to_customer() -> CopilotToCustomerData {
        CopilotToCustomerData {
            field_insights: vec![FieldInsight {
                hcp_id: "hcp-001".into(),
                observation: "Office staff now submit PAs electronically".into(),
                sentiment: Sentiment::Positive,
            }],
            call_outcomes: CallOutcomes {
                calls_completed: 18,
                positive: 11,
                neutral: 5,
                negative: 2,
            },
            barrier_updates: vec![BarrierUpdate {
                hcp_id: "hcp-001".into(),
                barrier: BarrierCategory::PriorAuthorization,
                resolved: true,
            }],
        }
    }

    /// Sample output published by `stage`.
    pub fn output_for(stage: StageId) -> StageOutput {
        match stage {
            StageId::CustomerPlanning => customer_to_budget().into(),
            StageId::BudgetPlanning => budget_to_content().into(),
            StageId::ContentReview => content_to_orchestration().into(),
            StageId::Orchestration => orchestration_to_suggestions().into(),
            StageId::FieldSuggestions => suggestions_to_copilot().into(),
            StageId::FieldCopilot => copilot_to_customer().into(),
        }
    }

    /// One JSONL line per stage in the format `cadence replay` reads.
    pub fn replay_lines() -> String {
        StageId::ALL
            .into_iter()
            .map(|s| {
                serde_json::json!({ "stage": s, "data": output_for(s).data_json() }).to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
