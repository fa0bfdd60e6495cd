//! The final report of an evaluation run.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::accumulator::ScoreAccumulator;
use super::selection::DocumentSelection;
use super::task::{EvaluationTask, MAX_SCORE, TaskStatus};

/// A run's tasks, aggregate score and termination state.
///
/// Only the orchestrator builds and mutates runs; callers get the finished
/// value back from [`EvaluationOrchestrator::run`](super::EvaluationOrchestrator::run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct EvaluationRun {
    pub(crate) document_selection: DocumentSelection,
    /// Tasks in generation order.
    pub(crate) tasks: Vec<EvaluationTask>,
    pub(crate) accumulator: ScoreAccumulator,
    /// True when stopped by cancellation before every task was processed.
    pub(crate) cancelled: bool,
    /// Wall time of the whole run in milliseconds.
    pub(crate) elapsed_ms: u64,
}

impl EvaluationRun {
    pub(crate) fn new(document_selection: DocumentSelection, tasks: Vec<EvaluationTask>) -> Self {
        Self {
            document_selection,
            tasks,
            accumulator: ScoreAccumulator::new(),
            cancelled: false,
            elapsed_ms: 0,
        }
    }

    pub fn document_selection(&self) -> &DocumentSelection {
        &self.document_selection
    }

    /// Tasks in generation order.
    pub fn tasks(&self) -> &[EvaluationTask] {
        &self.tasks
    }

    pub fn accumulator(&self) -> &ScoreAccumulator {
        &self.accumulator
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn total_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn completed_count(&self) -> usize {
        self.accumulator.completed_count()
    }

    pub fn failed_count(&self) -> usize {
        self.accumulator.failed_count()
    }

    pub fn score_sum(&self) -> f64 {
        self.accumulator.score_sum()
    }

    /// `None` when nothing succeeded.
    pub fn average_score(&self) -> Option<f64> {
        self.accumulator.average_score()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// Every task reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(EvaluationTask::is_terminal)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &EvaluationTask> {
        self.with_status(TaskStatus::Succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &EvaluationTask> {
        self.with_status(TaskStatus::Failed)
    }

    /// Tasks left untouched by a cancelled run.
    pub fn pending(&self) -> impl Iterator<Item = &EvaluationTask> {
        self.with_status(TaskStatus::Pending)
    }

    fn with_status(&self, status: TaskStatus) -> impl Iterator<Item = &EvaluationTask> {
        self.tasks.iter().filter(move |t| t.status() == status)
    }

    /// Print summary and per-item breakdown to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Evaluation Results ==========");
        println!("Documents: {}", self.document_selection);
        println!("Total questions: {}", self.total_tasks());
        println!("----------------------------------------");
        println!("Graded:  {}", self.completed_count());
        println!("Failed:  {}", self.failed_count());
        if self.cancelled {
            println!("Pending: {} (run cancelled)", self.pending().count());
        }
        println!("----------------------------------------");
        match self.average_score() {
            Some(avg) => println!("Average score: {:.2}/{}", avg, MAX_SCORE),
            None => println!("Average score: n/a (no graded questions)"),
        }
        println!("Total time: {:.1}s", self.elapsed().as_secs_f64());
        println!("========================================");

        if self.succeeded().next().is_some() {
            println!("\nGraded questions:");
            for task in self.succeeded() {
                if let Some(result) = task.result() {
                    println!("{:>3}. [{}/{}] {}", task.index() + 1, result.score, MAX_SCORE, task.question());
                    println!("     Answer: {}", preview(&result.generated_answer, 160));
                    println!("     Chunks: {}", result.relevant_chunks.len());
                }
            }
        }

        if self.failed().next().is_some() {
            println!("\nCould not grade:");
            for task in self.failed() {
                if let Some(failure) = task.failure() {
                    println!("{:>3}. {}", task.index() + 1, task.question());
                    println!("     Reason: {}", failure.reason());
                }
            }
        }
        println!();
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
