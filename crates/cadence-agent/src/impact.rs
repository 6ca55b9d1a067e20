//! Downstream impact preview.
//!
//! Ratings are a coarse, position-based estimate shown to a user before they
//! commit a change. They are not derived from any model of the downstream
//! stages and must not be read as measured effects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cadence_core::config::ImpactConfig;
use cadence_core::stage::StageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }

    /// Bucketed change range shown alongside the rating.
    fn estimated_range(self) -> &'static str {
        match self {
            Self::High => "±10-20% (estimated)",
            Self::Medium => "±5-10% (estimated)",
        }
    }
}

/// Preview of how one downstream stage is affected by a proposed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageImpact {
    pub affected: bool,
    pub severity: Severity,
    pub description: String,
    pub estimated_change: String,
}

/// Rates every stage after the changed one.
#[derive(Debug, Clone)]
pub struct ImpactEstimator {
    high_severity_window: usize,
}

impl Default for ImpactEstimator {
    fn default() -> Self {
        Self::new(&ImpactConfig::default())
    }
}

impl ImpactEstimator {
    pub fn new(config: &ImpactConfig) -> Self {
        Self {
            high_severity_window: config.high_severity_window,
        }
    }

    /// Impact on each stage strictly after `stage`, keyed in pipeline order.
    pub fn estimate(
        &self,
        stage: StageId,
        changes: &serde_json::Value,
    ) -> BTreeMap<StageId, StageImpact> {
        let changed = changed_fields(changes);
        let affected = !changed.is_empty();

        stage
            .downstream()
            .iter()
            .enumerate()
            .map(|(offset, &downstream)| {
                let severity = if offset < self.high_severity_window {
                    Severity::High
                } else {
                    Severity::Medium
                };
                let hops = offset + 1;
                let description = if affected {
                    format!(
                        "{} receives {} output {} ({} changed: {})",
                        downstream.display_name(),
                        stage.display_name(),
                        if hops == 1 {
                            "directly".to_string()
                        } else {
                            format!("through {}", plural(hops - 1, "intermediate stage"))
                        },
                        plural(changed.len(), "field"),
                        changed.join(", "),
                    )
                } else {
                    format!("{} is unaffected: no changes proposed", downstream.display_name())
                };
                let estimated_change = if affected {
                    severity.estimated_range().to_string()
                } else {
                    "no change".to_string()
                };
                (
                    downstream,
                    StageImpact {
                        affected,
                        severity,
                        description,
                        estimated_change,
                    },
                )
            })
            .collect()
    }
}

/// Impact preview with the default rating window.
pub fn estimate_downstream_impact(
    stage: StageId,
    changes: &serde_json::Value,
) -> BTreeMap<StageId, StageImpact> {
    ImpactEstimator::default().estimate(stage, changes)
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

/// Names of the fields a change set touches. Non-object values count as a
/// single anonymous change unless null.
fn changed_fields(changes: &serde_json::Value) -> Vec<String> {
    match changes {
        serde_json::Value::Object(map) => map.keys().cloned().collect(),
        serde_json::Value::Null => vec![],
        serde_json::Value::Array(items) if items.is_empty() => vec![],
        _ => vec!["value".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_later_stages_included() {
        for stage in StageId::ALL {
            let impact = estimate_downstream_impact(stage, &json!({"budget": 1}));
            assert!(!impact.contains_key(&stage));
            assert!(impact.keys().all(|k| *k > stage));
            assert_eq!(impact.len(), StageId::ALL.len() - 1 - stage.position());
        }
    }

    #[test]
    fn test_severity_by_position() {
        let impact = estimate_downstream_impact(StageId::CustomerPlanning, &json!({"segments": []}));
        let severities: Vec<_> = impact.values().map(|i| i.severity).collect();
        assert_eq!(
            severities,
            vec![
                Severity::High,
                Severity::High,
                Severity::High,
                Severity::Medium,
                Severity::Medium
            ]
        );
        assert_eq!(impact[&StageId::BudgetPlanning].estimated_change, "±10-20% (estimated)");
        assert_eq!(impact[&StageId::FieldCopilot].estimated_change, "±5-10% (estimated)");
    }

    #[test]
    fn test_last_stage_has_no_downstream() {
        assert!(estimate_downstream_impact(StageId::FieldCopilot, &json!({"x": 1})).is_empty());
    }

    #[test]
    fn test_description_names_changed_fields() {
        let impact = estimate_downstream_impact(
            StageId::BudgetPlanning,
            &json!({"total_budget": 2_000_000, "expected_roi": 3.1}),
        );
        let direct = &impact[&StageId::ContentReview];
        assert!(direct.affected);
        assert!(direct.description.contains("directly"));
        assert!(direct.description.contains("expected_roi, total_budget"));

        let far = &impact[&StageId::FieldCopilot];
        assert!(far.description.contains("through 3 intermediate stages"));
        assert!(impact[&StageId::FieldSuggestions]
            .description
            .contains("through 1 intermediate stage "));
    }

    #[test]
    fn test_empty_changes_not_affected() {
        let impact = estimate_downstream_impact(StageId::ContentReview, &json!({}));
        assert!(impact.values().all(|i| !i.affected && i.estimated_change == "no change"));
        let impact = estimate_downstream_impact(StageId::ContentReview, &serde_json::Value::Null);
        assert!(impact.values().all(|i| !i.affected));
    }

    #[test]
    fn test_configurable_window() {
        let estimator = ImpactEstimator::new(&ImpactConfig { high_severity_window: 1 });
        let impact = estimator.estimate(StageId::CustomerPlanning, &json!(5));
        assert_eq!(impact[&StageId::BudgetPlanning].severity, Severity::High);
        assert_eq!(impact[&StageId::ContentReview].severity, Severity::Medium);
        assert!(impact[&StageId::ContentReview].description.contains("1 field"));
    }
}
