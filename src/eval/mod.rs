//! Evaluation harness.
//!
//! This module provides:
//! - Task lifecycle and running score aggregation
//! - Collaborator contracts for test set generation and grading
//! - The sequential orchestrator with progress snapshots and cancellation
//! - Saved test sets that can be replayed instead of regenerated

pub mod accumulator;
pub mod collaborator;
pub mod orchestrator;
pub mod progress;
pub mod run;
pub mod selection;
pub mod task;
pub mod test_set;

pub use accumulator::ScoreAccumulator;
pub use collaborator::{GradingClient, TestItem, TestSetProvider};
pub use orchestrator::{EvaluationOrchestrator, RunHandle};
pub use progress::{ChannelSink, FnSink, NoopSink, ProgressSink, ProgressSnapshot, RunEvent};
pub use run::EvaluationRun;
pub use selection::DocumentSelection;
pub use task::{EvaluationTask, GradeResult, TaskFailure, TaskState, TaskStatus};
pub use test_set::{FileTestSetProvider, TestSet};
