pub mod config;
pub mod error;
pub mod event;
pub mod package;
pub mod stage;
pub mod traits;
pub mod types;

pub use config::{CadenceConfig, UserPreferences};
pub use error::{CadenceError, Result};
pub use event::EventBus;
pub use package::{DataPackage, PackagePayload, StageOutput};
pub use stage::{Dependency, DependencyGraph, DependencyKind, StageId};
pub use traits::AgentDataStore;
pub use types::*;
