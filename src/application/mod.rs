//! Application layer: plan execution strategies and the decision pipeline.

pub mod backtracking_executor;
pub mod executor;
pub mod pipeline;

pub use backtracking_executor::{BacktrackOutcome, BacktrackingExecutor};
pub use executor::{synthesize_response, Executor};
pub use pipeline::{DecisionOutcome, DecisionPipeline, DecisionRequest, PipelinePorts};
