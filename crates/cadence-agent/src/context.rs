use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;
use tracing::{debug, info};

use cadence_core::config::CadenceConfig;
use cadence_core::error::{CadenceError, Result};
use cadence_core::event::EventBus;
use cadence_core::package::StageOutput;
use cadence_core::stage::{DependencyGraph, StageId};
use cadence_core::traits::AgentDataStore;
use cadence_core::types::{AgentData, DataFlowEvent, PipelineEvent};

use crate::impact::{ImpactEstimator, StageImpact};

#[derive(Default)]
struct ContextState {
    data: HashMap<StageId, AgentData>,
    events: VecDeque<DataFlowEvent>,
}

/// Session-lifetime store of every stage's latest output.
///
/// One instance is built at the application entry point and shared by
/// `Arc`; nothing here is global. Writes are last-write-wins.
pub struct AgentDataContext {
    state: RwLock<ContextState>,
    graph: DependencyGraph,
    estimator: ImpactEstimator,
    event_capacity: usize,
    bus: EventBus,
}

impl Default for AgentDataContext {
    fn default() -> Self {
        Self::new(&CadenceConfig::default())
    }
}

impl AgentDataContext {
    pub fn new(config: &CadenceConfig) -> Self {
        Self {
            state: RwLock::new(ContextState::default()),
            graph: DependencyGraph,
            estimator: ImpactEstimator::new(&config.impact),
            event_capacity: config.context.event_log_capacity.max(1),
            bus: EventBus::new(config.context.subscriber_buffer),
        }
    }

    // A panicked writer cannot leave the maps half-updated, so a poisoned
    // lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, ContextState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ContextState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Store `output` as the latest data for `stage` and log the hand-off
    /// to its successor.
    pub fn update_agent_data(&self, stage: StageId, output: StageOutput) -> Result<()> {
        let produced_by = output.stage();
        if produced_by != stage {
            return Err(CadenceError::StageMismatch { stage, produced_by });
        }

        let record = AgentData::new(output);
        let updated_at = record.updated_at;
        let payload = record.output.data_json();

        let flow = {
            let mut state = self.write();
            let replaced = state.data.insert(stage, record).is_some();
            debug!(stage = %stage, replaced, "Stored stage output");

            let to = stage.successor();
            let mut event = DataFlowEvent::new(stage, to, payload);
            event.timestamp = updated_at;
            self.push_event(&mut state, event.clone());
            event
        };

        info!(from = %flow.from, to = %flow.to, "Stage data updated");
        self.bus.publish(PipelineEvent::StageUpdated { stage, updated_at });
        self.bus.publish(PipelineEvent::DataFlow(flow));
        Ok(())
    }

    fn push_event(&self, state: &mut ContextState, event: DataFlowEvent) {
        state.events.push_back(event);
        while state.events.len() > self.event_capacity {
            state.events.pop_front();
        }
    }

    /// Latest stored output for `stage`.
    pub fn get_agent_data(&self, stage: StageId) -> Option<AgentData> {
        self.read().data.get(&stage).cloned()
    }

    /// All stored outputs, in pipeline order.
    pub fn snapshot(&self) -> BTreeMap<StageId, AgentData> {
        self.read()
            .data
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    /// Stored output of every declared dependency of `stage`, feedback
    /// edges included. Dependencies with nothing stored are omitted.
    pub fn get_upstream_data(&self, stage: StageId) -> BTreeMap<StageId, AgentData> {
        let state = self.read();
        self.graph
            .dependencies(stage)
            .iter()
            .filter_map(|dep| state.data.get(&dep.stage).map(|d| (dep.stage, d.clone())))
            .collect()
    }

    /// Whether every required dependency of `stage` has produced output.
    pub fn is_data_available(&self, stage: StageId) -> bool {
        let state = self.read();
        let mut missing = self.graph.required(stage).filter(|s| !state.data.contains_key(s));
        match missing.next() {
            None => true,
            Some(first) => {
                debug!(stage = %stage, missing = %first, "Upstream data unavailable");
                false
            }
        }
    }

    /// Availability of every stage, in pipeline order.
    pub fn readiness(&self) -> Vec<(StageId, bool)> {
        StageId::ALL
            .into_iter()
            .map(|s| (s, self.is_data_available(s)))
            .collect()
    }

    /// Preview how `changes` at `stage` would ripple downstream. Reads only.
    pub fn get_downstream_impact(
        &self,
        stage: StageId,
        changes: &serde_json::Value,
    ) -> BTreeMap<StageId, StageImpact> {
        self.estimator.estimate(stage, changes)
    }

    /// Append an event outside the normal update path (demo injection).
    pub fn add_data_flow_event(&self, event: DataFlowEvent) {
        if !event.is_adjacent() {
            debug!(from = %event.from, to = %event.to, "Logging data flow between non-adjacent stages");
        }
        {
            let mut state = self.write();
            self.push_event(&mut state, event.clone());
        }
        self.bus.publish(PipelineEvent::DataFlow(event));
    }

    pub fn clear_data_flow_events(&self) {
        self.write().events.clear();
        self.bus.publish(PipelineEvent::DataFlowCleared);
    }

    /// Retained events, oldest first.
    pub fn data_flow_events(&self) -> Vec<DataFlowEvent> {
        self.read().events.iter().cloned().collect()
    }

    /// Drop every stored output and event.
    pub fn reset(&self) {
        {
            let mut state = self.write();
            state.data.clear();
            state.events.clear();
        }
        info!("Agent data context reset");
        self.bus.publish(PipelineEvent::ContextReset);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.bus.subscribe()
    }
}

impl AgentDataStore for AgentDataContext {
    fn get(&self, stage: StageId) -> Option<AgentData> {
        self.get_agent_data(stage)
    }

    fn set(&self, stage: StageId, output: StageOutput) -> Result<()> {
        self.update_agent_data(stage, output)
    }

    fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.bus.subscribe()
    }
}
