//! Progress snapshots and the sinks that receive them.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::accumulator::ScoreAccumulator;
use super::run::EvaluationRun;
use super::task::EvaluationTask;
use crate::error::Result;

/// Point-in-time copy of a run's progress and partial results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub completed_count: usize,
    pub failed_count: usize,
    pub total_tasks: usize,
    /// `None` until at least one task succeeded.
    pub average_score: Option<f64>,
    /// Every task of the run, in generation order.
    pub tasks: Vec<EvaluationTask>,
}

impl ProgressSnapshot {
    pub(crate) fn capture(accumulator: &ScoreAccumulator, tasks: &[EvaluationTask]) -> Self {
        Self {
            completed_count: accumulator.completed_count(),
            failed_count: accumulator.failed_count(),
            total_tasks: tasks.len(),
            average_score: accumulator.average_score(),
            tasks: tasks.to_vec(),
        }
    }

    /// Tasks that reached a terminal state.
    pub fn current(&self) -> usize {
        self.completed_count + self.failed_count
    }

    /// Fraction of tasks processed, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        self.current() as f64 / self.total_tasks.max(1) as f64
    }
}

/// Receives snapshots pushed by the orchestrator after each terminal transition.
///
/// Called inline on the run's task; implementations should hand the snapshot
/// off rather than do slow work.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, snapshot: ProgressSnapshot);
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn publish(&self, _snapshot: ProgressSnapshot) {}
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(ProgressSnapshot) + Send + Sync,
{
    fn publish(&self, snapshot: ProgressSnapshot) {
        (self.0)(snapshot)
    }
}

/// Event delivered by [`RunHandle`](super::orchestrator::RunHandle).
#[derive(Debug)]
pub enum RunEvent {
    Progress(ProgressSnapshot),
    /// Always the last event of a run.
    Finished(Result<EvaluationRun>),
}

/// Forwards snapshots into an unbounded channel, preserving push order.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn publish(&self, snapshot: ProgressSnapshot) {
        // A dropped receiver only means nobody is watching; the run carries on.
        let _ = self.tx.send(RunEvent::Progress(snapshot));
    }
}
