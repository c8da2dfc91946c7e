//! Switchyard engine: compiles declarative routing trees into plans and
//! interprets them.
//!
//! A plan is a tree of steps. Routers pick one of their children by route
//! key; actions produce output and may chain to a single successor. The
//! `Runner` walks a plan from its root, feeding each step the most recent
//! output (or the original input) and recording every invocation on the
//! run's `Context`.

pub mod definition;
pub mod loader;
pub mod plan;
pub mod registry;
pub mod run_log;
pub mod runner;

pub use definition::PlanDefinition;
pub use loader::PlanLoader;
pub use plan::{NodeId, Plan, PlanBuilder, PlanNode};
pub use registry::StepRegistry;
pub use run_log::RunLogger;
pub use runner::Runner;
