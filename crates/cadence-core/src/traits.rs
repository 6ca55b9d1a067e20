use tokio::sync::broadcast;

use crate::error::Result;
use crate::package::StageOutput;
use crate::stage::StageId;
use crate::types::{AgentData, PipelineEvent};

/// Store holding the latest output of every stage.
///
/// Implementations are shared behind an `Arc` and use interior mutability;
/// every method takes `&self`.
pub trait AgentDataStore: Send + Sync + 'static {
    /// Latest output stored for a stage.
    fn get(&self, stage: StageId) -> Option<AgentData>;

    /// Store a stage's output, replacing any previous value.
    fn set(&self, stage: StageId, output: StageOutput) -> Result<()>;

    /// Receive every event the store publishes from now on.
    fn subscribe(&self) -> broadcast::Receiver<PipelineEvent>;
}
