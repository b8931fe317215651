//! The orchestration layer: routes inbound chat messages to the store and
//! the conversation state machine, and runs the periodic alert evaluator.

pub mod dispatch;
pub mod error;
pub mod evaluator;

#[cfg(test)]
mod testkit;

pub use dispatch::{Dispatcher, Inbound};
pub use error::EngineError;
pub use evaluator::{Evaluator, RunSummary};
