pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod record;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use context::{latest_output_or_input, Context};
pub use error::{Result, SwitchyardError};
pub use event::{EventBus, EventSink, NullSink, PlanEvent};
pub use record::ExecutionRecord;
pub use traits::{ActionStep, RouterStep, Step, StepKind, StepResolver};
pub use types::*;
