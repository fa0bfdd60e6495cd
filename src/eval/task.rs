//! A single question-grading unit of work and its lifecycle.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::selection::DocumentSelection;
use crate::error::{CollaboratorError, EvalError, Result};

/// Lowest score the grader may award.
pub const MIN_SCORE: f64 = 0.0;
/// Highest score the grader may award.
pub const MAX_SCORE: f64 = 5.0;

/// Whether `score` is a finite value in the grading range.
pub fn is_valid_score(score: f64) -> bool {
    score.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&score)
}

/// Coarse lifecycle position of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

/// What the QA service produced for one graded question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct GradeResult {
    /// Answer the RAG pipeline generated.
    pub generated_answer: String,
    /// Retrieved chunks, in retrieval order.
    pub relevant_chunks: Vec<String>,
    /// Judge score in `MIN_SCORE..=MAX_SCORE`.
    pub score: f64,
    /// Judge reasoning, when the service returns it.
    pub feedback: Option<String>,
}

/// Why a task could not be graded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum TaskFailure {
    /// The grading call exceeded its deadline.
    Timeout { after_ms: u64 },
    /// The grading call failed or returned something unusable.
    CollaboratorError { reason: String, transient: bool },
}

impl TaskFailure {
    /// Human-readable cause, shown in the report breakdown.
    pub fn reason(&self) -> String {
        match self {
            TaskFailure::Timeout { after_ms } => format!("Timeout after {}ms", after_ms),
            TaskFailure::CollaboratorError { reason, transient } => {
                if *transient {
                    format!("{} (transient)", reason)
                } else {
                    reason.clone()
                }
            }
        }
    }
}

impl From<CollaboratorError> for TaskFailure {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Timeout(after) => TaskFailure::Timeout {
                after_ms: after.as_millis() as u64,
            },
            CollaboratorError::Transient(reason) => TaskFailure::CollaboratorError {
                reason,
                transient: true,
            },
            CollaboratorError::Fatal(reason) => TaskFailure::CollaboratorError {
                reason,
                transient: false,
            },
        }
    }
}

/// Task state. The payload only exists in the matching terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded(GradeResult),
    Failed(TaskFailure),
}

impl TaskState {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskState::Pending => TaskStatus::Pending,
            TaskState::Running => TaskStatus::Running,
            TaskState::Succeeded(_) => TaskStatus::Succeeded,
            TaskState::Failed(_) => TaskStatus::Failed,
        }
    }
}

/// Terminal outcome handed to the accumulator, exactly once per task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskOutcome {
    Succeeded { score: f64 },
    Failed,
}

/// One question to grade against the run's document selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct EvaluationTask {
    /// Position in generation order.
    index: usize,
    question: String,
    reference_answer: String,
    document_scope: DocumentSelection,
    state: TaskState,
    /// Time spent in the grading call, set on the terminal transition.
    elapsed_ms: Option<u64>,
}

impl EvaluationTask {
    /// Create a task in the `Pending` state.
    pub fn new(
        index: usize,
        question: impl Into<String>,
        reference_answer: impl Into<String>,
        document_scope: DocumentSelection,
    ) -> Self {
        Self {
            index,
            question: question.into(),
            reference_answer: reference_answer.into(),
            document_scope,
            state: TaskState::Pending,
            elapsed_ms: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn reference_answer(&self) -> &str {
        &self.reference_answer
    }

    /// Documents the question is answered against.
    pub fn document_scope(&self) -> &DocumentSelection {
        &self.document_scope
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn result(&self) -> Option<&GradeResult> {
        match &self.state {
            TaskState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match &self.state {
            TaskState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed_ms.map(Duration::from_millis)
    }

    /// Pending -> Running.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_status(TaskStatus::Pending, TaskStatus::Running)?;
        self.state = TaskState::Running;
        Ok(())
    }

    /// Running -> Succeeded. Scores outside the grading range are refused.
    pub fn succeed(&mut self, result: GradeResult, elapsed: Duration) -> Result<TaskOutcome> {
        self.ensure_status(TaskStatus::Running, TaskStatus::Succeeded)?;
        if !is_valid_score(result.score) {
            return Err(EvalError::ScoreOutOfRange(result.score));
        }

        let score = result.score;
        self.state = TaskState::Succeeded(result);
        self.elapsed_ms = Some(elapsed.as_millis() as u64);
        Ok(TaskOutcome::Succeeded { score })
    }

    /// Running -> Failed.
    pub fn fail(&mut self, failure: TaskFailure, elapsed: Duration) -> Result<TaskOutcome> {
        self.ensure_status(TaskStatus::Running, TaskStatus::Failed)?;
        self.state = TaskState::Failed(failure);
        self.elapsed_ms = Some(elapsed.as_millis() as u64);
        Ok(TaskOutcome::Failed)
    }

    fn ensure_status(&self, expected: TaskStatus, to: TaskStatus) -> Result<()> {
        let from = self.status();
        if from != expected {
            return Err(EvalError::InvalidTransition { from, to });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> EvaluationTask {
        let scope = DocumentSelection::new(["a.pdf"]).unwrap();
        EvaluationTask::new(0, "What is X?", "X is Y", scope)
    }

    fn grade(score: f64) -> GradeResult {
        GradeResult {
            generated_answer: "X is Y".to_string(),
            relevant_chunks: vec!["chunk".to_string()],
            score,
            feedback: None,
        }
    }

    #[test]
    fn test_happy_path() {
        let mut task = task();
        assert_eq!(task.status(), TaskStatus::Pending);

        task.start().unwrap();
        assert_eq!(task.status(), TaskStatus::Running);

        let outcome = task.succeed(grade(4.0), Duration::from_millis(12)).unwrap();
        assert_eq!(outcome, TaskOutcome::Succeeded { score: 4.0 });
        assert_eq!(task.result().unwrap().score, 4.0);
        assert!(task.failure().is_none());
        assert_eq!(task.elapsed(), Some(Duration::from_millis(12)));
    }

    #[test]
    fn test_terminal_is_final() {
        let mut task = task();
        task.start().unwrap();
        task.fail(
            TaskFailure::Timeout { after_ms: 30_000 },
            Duration::from_secs(30),
        )
        .unwrap();

        assert!(matches!(
            task.start(),
            Err(EvalError::InvalidTransition {
                from: TaskStatus::Failed,
                to: TaskStatus::Running
            })
        ));
        assert!(task.succeed(grade(5.0), Duration::ZERO).is_err());
        assert!(task.fail(TaskFailure::Timeout { after_ms: 1 }, Duration::ZERO).is_err());
        assert_eq!(task.failure().unwrap().reason(), "Timeout after 30000ms");
    }

    #[test]
    fn test_cannot_succeed_without_running() {
        let mut task = task();
        assert!(task.succeed(grade(3.0), Duration::ZERO).is_err());
        assert_eq!(task.status(), TaskStatus::Pending);
    }

    #[test]
    fn test_out_of_range_score_leaves_task_running() {
        let mut task = task();
        task.start().unwrap();
        assert!(task.succeed(grade(7.0), Duration::ZERO).is_err());
        assert!(task.succeed(grade(f64::NAN), Duration::ZERO).is_err());
        assert_eq!(task.status(), TaskStatus::Running);
    }

    #[test]
    fn test_cannot_fail_before_dispatch() {
        let mut task = task();
        assert!(task.fail(TaskFailure::Timeout { after_ms: 1 }, Duration::ZERO).is_err());
        assert_eq!(task.status(), TaskStatus::Pending);
    }

    #[test]
    fn test_failure_from_collaborator_error() {
        let failure: TaskFailure = CollaboratorError::Transient("503".to_string()).into();
        assert_eq!(failure.reason(), "503 (transient)");

        let failure: TaskFailure = CollaboratorError::Timeout(Duration::from_secs(2)).into();
        assert_eq!(failure, TaskFailure::Timeout { after_ms: 2000 });
    }
}
