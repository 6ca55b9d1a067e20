//! Typed payload contracts exchanged between adjacent pipeline stages.
//!
//! Field names are the wire contract consumed by downstream reports. Shapes
//! only ever grow: any field added after the first release must carry
//! `#[serde(default)]` so older payloads keep deserializing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};
use crate::stage::StageId;

/// A payload type bound to exactly one stage-to-stage edge.
pub trait PackagePayload: Serialize + DeserializeOwned + Clone {
    const SOURCE: StageId;
    const DESTINATION: StageId;
}

/// Envelope around a stage-pair payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPackage<T> {
    pub timestamp: DateTime<Utc>,
    pub source: StageId,
    pub destination: StageId,
    pub data: T,
}

impl<T: PackagePayload> DataPackage<T> {
    /// Wrap a payload, deriving source and destination from its type.
    pub fn new(data: T) -> Self {
        Self {
            timestamp: Utc::now(),
            source: T::SOURCE,
            destination: T::DESTINATION,
            data,
        }
    }

    /// Check a deserialized envelope against the payload's edge.
    pub fn validate(&self) -> Result<()> {
        if self.source != T::SOURCE || self.destination != T::DESTINATION {
            return Err(CadenceError::InvalidPackage(format!(
                "expected {} -> {}, got {} -> {}",
                T::SOURCE,
                T::DESTINATION,
                self.source,
                self.destination
            )));
        }
        if !self.source.is_adjacent_to(self.destination) {
            return Err(CadenceError::InvalidPackage(format!(
                "{} and {} are not adjacent stages",
                self.source, self.destination
            )));
        }
        Ok(())
    }

    /// Parse and validate an envelope from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let package: Self = serde_json::from_str(json)?;
        package.validate()?;
        Ok(package)
    }
}

pub type CustomerToBudgetPackage = DataPackage<CustomerToBudgetData>;
pub type BudgetToContentPackage = DataPackage<BudgetToContentData>;
pub type ContentToOrchestrationPackage = DataPackage<ContentToOrchestrationData>;
pub type OrchestrationToSuggestionsPackage = DataPackage<OrchestrationToSuggestionsData>;
pub type SuggestionsToCopilotPackage = DataPackage<SuggestionsToCopilotData>;
pub type CopilotToCustomerPackage = DataPackage<CopilotToCustomerData>;

// ── Customer Planning → Budget Planning ────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerToBudgetData {
    pub prioritized_hcps: Vec<PrioritizedHcp>,
    pub barrier_analysis: BarrierAnalysis,
    pub engagement_recommendations: ChannelCounts,
    pub total_opportunity_value: f64,
    pub segments: Vec<Segment>,
}

impl PackagePayload for CustomerToBudgetData {
    const SOURCE: StageId = StageId::CustomerPlanning;
    const DESTINATION: StageId = StageId::BudgetPlanning;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedHcp {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub tier: HcpTier,
    pub opportunity_score: f64,
    #[serde(default)]
    pub primary_barrier: Option<BarrierCategory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HcpTier {
    A,
    B,
    C,
}

/// The fixed set of prescribing barriers tracked across the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierCategory {
    FormularyAccess,
    PriorAuthorization,
    ClinicalInertia,
    SafetyConcerns,
    CostBurden,
}

impl BarrierCategory {
    pub const ALL: [BarrierCategory; 5] = [
        BarrierCategory::FormularyAccess,
        BarrierCategory::PriorAuthorization,
        BarrierCategory::ClinicalInertia,
        BarrierCategory::SafetyConcerns,
        BarrierCategory::CostBurden,
    ];
}

/// Severity share per barrier category. Always exactly five entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierAnalysis {
    pub formulary_access: f64,
    pub prior_authorization: f64,
    pub clinical_inertia: f64,
    pub safety_concerns: f64,
    pub cost_burden: f64,
}

impl BarrierAnalysis {
    pub fn severity(&self, category: BarrierCategory) -> f64 {
        match category {
            BarrierCategory::FormularyAccess => self.formulary_access,
            BarrierCategory::PriorAuthorization => self.prior_authorization,
            BarrierCategory::ClinicalInertia => self.clinical_inertia,
            BarrierCategory::SafetyConcerns => self.safety_concerns,
            BarrierCategory::CostBurden => self.cost_burden,
        }
    }

    /// Category with the highest severity (first wins on ties).
    pub fn dominant(&self) -> BarrierCategory {
        BarrierCategory::ALL
            .into_iter()
            .fold(BarrierCategory::FormularyAccess, |best, c| {
                if self.severity(c) > self.severity(best) {
                    c
                } else {
                    best
                }
            })
    }
}

/// Recommended engagement count per channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelCounts {
    pub in_person: u32,
    #[serde(rename = "virtual")]
    pub virtual_visit: u32,
    pub email: u32,
    pub speaker_program: u32,
    pub digital: u32,
}

impl ChannelCounts {
    pub fn total(&self) -> u32 {
        self.in_person + self.virtual_visit + self.email + self.speaker_program + self.digital
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub size: u32,
    pub avg_opportunity: f64,
}

// ── Budget Planning → Content Review ───────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetToContentData {
    pub total_budget: f64,
    pub channel_allocations: Vec<ChannelAllocation>,
    pub content_requirements: Vec<ContentRequirement>,
    pub expected_roi: f64,
    #[serde(default = "default_planning_horizon")]
    pub planning_horizon_weeks: u32,
}

fn default_planning_horizon() -> u32 {
    13
}

impl PackagePayload for BudgetToContentData {
    const SOURCE: StageId = StageId::BudgetPlanning;
    const DESTINATION: StageId = StageId::ContentReview;
}

impl BudgetToContentData {
    /// Sum of all channel allocations.
    pub fn allocated(&self) -> f64 {
        self.channel_allocations.iter().map(|a| a.amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAllocation {
    pub channel: String,
    pub amount: f64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRequirement {
    pub channel: String,
    pub theme: String,
    pub quantity: u32,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

// ── Content Review → AI Orchestration ──────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentToOrchestrationData {
    pub approved_assets: Vec<ApprovedAsset>,
    pub pending_review: u32,
    pub rejected: u32,
    #[serde(default)]
    pub average_review_days: f64,
}

impl PackagePayload for ContentToOrchestrationData {
    const SOURCE: StageId = StageId::ContentReview;
    const DESTINATION: StageId = StageId::Orchestration;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedAsset {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub theme: String,
    pub compliance_score: f64,
}

// ── AI Orchestration → Field Suggestions ───────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationToSuggestionsData {
    pub model_performance: ModelPerformance,
    pub next_best_actions: Vec<NextBestAction>,
    #[serde(default)]
    pub journey_distribution: BTreeMap<String, u32>,
}

impl PackagePayload for OrchestrationToSuggestionsData {
    const SOURCE: StageId = StageId::Orchestration;
    const DESTINATION: StageId = StageId::FieldSuggestions;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextBestAction {
    pub hcp_id: String,
    pub channel: String,
    pub content_id: String,
    pub recommended_day: String,
    pub confidence: f64,
}

// ── Field Suggestions → Field Copilot ──────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionsToCopilotData {
    pub suggestions: Vec<FieldSuggestion>,
    #[serde(default)]
    pub trigger_counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub acceptance_rate: f64,
}

impl PackagePayload for SuggestionsToCopilotData {
    const SOURCE: StageId = StageId::FieldSuggestions;
    const DESTINATION: StageId = StageId::FieldCopilot;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSuggestion {
    pub id: String,
    pub hcp_id: String,
    pub priority: Priority,
    pub action: String,
    pub rationale: String,
    pub trigger: String,
}

// ── Field Copilot → Customer Planning (feedback) ───────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotToCustomerData {
    pub field_insights: Vec<FieldInsight>,
    pub call_outcomes: CallOutcomes,
    #[serde(default)]
    pub barrier_updates: Vec<BarrierUpdate>,
}

impl PackagePayload for CopilotToCustomerData {
    const SOURCE: StageId = StageId::FieldCopilot;
    const DESTINATION: StageId = StageId::CustomerPlanning;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInsight {
    pub hcp_id: String,
    pub observation: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOutcomes {
    pub calls_completed: u32,
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierUpdate {
    pub hcp_id: String,
    pub barrier: BarrierCategory,
    pub resolved: bool,
}

// ── Stage outputs ──────────────────────────────────────────────────

/// The latest output a stage has published, one variant per producing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "data", rename_all = "snake_case")]
pub enum StageOutput {
    CustomerPlanning(CustomerToBudgetData),
    BudgetPlanning(BudgetToContentData),
    ContentReview(ContentToOrchestrationData),
    Orchestration(OrchestrationToSuggestionsData),
    FieldSuggestions(SuggestionsToCopilotData),
    FieldCopilot(CopilotToCustomerData),
}

impl StageOutput {
    /// Stage that produced this output.
    pub fn stage(&self) -> StageId {
        match self {
            Self::CustomerPlanning(_) => StageId::CustomerPlanning,
            Self::BudgetPlanning(_) => StageId::BudgetPlanning,
            Self::ContentReview(_) => StageId::ContentReview,
            Self::Orchestration(_) => StageId::Orchestration,
            Self::FieldSuggestions(_) => StageId::FieldSuggestions,
            Self::FieldCopilot(_) => StageId::FieldCopilot,
        }
    }

    /// Payload as a JSON value (without the stage tag).
    pub fn data_json(&self) -> serde_json::Value {
        let value = match self {
            Self::CustomerPlanning(d) => serde_json::to_value(d),
            Self::BudgetPlanning(d) => serde_json::to_value(d),
            Self::ContentReview(d) => serde_json::to_value(d),
            Self::Orchestration(d) => serde_json::to_value(d),
            Self::FieldSuggestions(d) => serde_json::to_value(d),
            Self::FieldCopilot(d) => serde_json::to_value(d),
        };
        // Plain data structs with string keys always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Parse an untagged payload for a known producing stage.
    pub fn from_stage_json(stage: StageId, data: serde_json::Value) -> Result<Self> {
        let output = match stage {
            StageId::CustomerPlanning => Self::CustomerPlanning(serde_json::from_value(data)?),
            StageId::BudgetPlanning => Self::BudgetPlanning(serde_json::from_value(data)?),
            StageId::ContentReview => Self::ContentReview(serde_json::from_value(data)?),
            StageId::Orchestration => Self::Orchestration(serde_json::from_value(data)?),
            StageId::FieldSuggestions => Self::FieldSuggestions(serde_json::from_value(data)?),
            StageId::FieldCopilot => Self::FieldCopilot(serde_json::from_value(data)?),
        };
        Ok(output)
    }
}

macro_rules! impl_from_payload {
    ($($payload:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for StageOutput {
                fn from(data: $payload) -> Self {
                    StageOutput::$variant(data)
                }
            }
        )*
    };
}

impl_from_payload! {
    CustomerToBudgetData => CustomerPlanning,
    BudgetToContentData => BudgetPlanning,
    ContentToOrchestrationData => ContentReview,
    OrchestrationToSuggestionsData => Orchestration,
    SuggestionsToCopilotData => FieldSuggestions,
    CopilotToCustomerData => FieldCopilot,
}
