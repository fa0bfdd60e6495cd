//! Sequential evaluation runner.
//!
//! Requests one test set, then grades its questions strictly one at a time.
//! Every task ends Succeeded or Failed on its own; a grading failure is
//! recorded on the task and the run moves on. A snapshot is pushed to the
//! [`ProgressSink`] after every terminal transition, so snapshots are totally
//! ordered and monotonic in the number of processed tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::collaborator::{GradingClient, TestSetProvider};
use super::progress::{ChannelSink, ProgressSink, ProgressSnapshot, RunEvent};
use super::run::EvaluationRun;
use super::selection::DocumentSelection;
use super::task::{EvaluationTask, GradeResult, TaskFailure, TaskOutcome, is_valid_score};
use crate::config::EvaluationConfig;
use crate::error::{CollaboratorError, EvalError, Result};

/// Drives one evaluation run at a time against a provider and a grader.
pub struct EvaluationOrchestrator<P, G> {
    provider: P,
    grader: G,
    config: EvaluationConfig,
}

impl<P, G> EvaluationOrchestrator<P, G>
where
    P: TestSetProvider,
    G: GradingClient,
{
    pub fn new(provider: P, grader: G, config: EvaluationConfig) -> Self {
        Self {
            provider,
            grader,
            config,
        }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Run an evaluation to completion or cancellation.
    ///
    /// Fails only for request-level problems: a zero `sample_count`
    /// (`InvalidRequest`, before any collaborator call), an empty test set
    /// (`EmptyTestSet`, no grading calls) or a failed generation call.
    /// Grading failures never fail the run.
    ///
    /// `cancel` is checked between tasks. A cancelled run returns `Ok` with
    /// `cancelled == true` and its unprocessed tasks still `Pending`.
    #[tracing::instrument(skip_all, fields(documents = %selection, sample_count = sample_count))]
    pub async fn run(
        &self,
        selection: &DocumentSelection,
        sample_count: usize,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<EvaluationRun> {
        let started = Instant::now();

        if sample_count == 0 {
            return Err(EvalError::InvalidRequest(
                "sample count must be at least 1".to_string(),
            ));
        }
        if selection.is_empty() {
            return Err(EvalError::InvalidRequest(
                "document selection must not be empty".to_string(),
            ));
        }

        let mut tasks = self.generate_tasks(selection, sample_count).await?;
        if tasks.len() > sample_count {
            debug!(returned = tasks.len(), "Provider over-delivered; truncating");
            tasks.truncate(sample_count);
        }
        if tasks.len() < sample_count {
            info!(
                returned = tasks.len(),
                "Provider returned fewer questions than requested"
            );
        }

        let mut run = EvaluationRun::new(selection.clone(), tasks);
        let total = run.total_tasks();
        info!(total, "Starting evaluation");

        for index in 0..total {
            if cancel.is_cancelled() {
                run.cancelled = true;
                warn!(
                    processed = run.accumulator.processed(),
                    remaining = total - index,
                    "Evaluation cancelled"
                );
                break;
            }

            let outcome = self.process_task(&mut run.tasks[index]).await?;
            run.accumulator.record(outcome);
            sink.publish(ProgressSnapshot::capture(&run.accumulator, &run.tasks));
        }

        run.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            completed = run.completed_count(),
            failed = run.failed_count(),
            average = ?run.average_score(),
            cancelled = run.cancelled,
            elapsed_ms = run.elapsed_ms,
            "Evaluation finished"
        );

        Ok(run)
    }

    async fn generate_tasks(
        &self,
        selection: &DocumentSelection,
        sample_count: usize,
    ) -> Result<Vec<EvaluationTask>> {
        let deadline = self.config.generate_timeout();
        info!(?deadline, "Requesting test set");

        let items = match timeout(deadline, self.provider.generate(selection, sample_count)).await
        {
            Ok(Ok(items)) => items,
            Ok(Err(err)) => {
                warn!(error = %err, "Test set generation failed");
                return Err(EvalError::Generation(err));
            }
            Err(_) => {
                warn!(?deadline, "Test set generation timed out");
                return Err(EvalError::Generation(CollaboratorError::Timeout(deadline)));
            }
        };

        if items.is_empty() {
            warn!("Test set provider returned no questions");
            return Err(EvalError::EmptyTestSet);
        }

        Ok(items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                EvaluationTask::new(index, item.question, item.reference_answer, selection.clone())
            })
            .collect())
    }

    /// Dispatch one Pending task and bring it to a terminal state.
    async fn process_task(&self, task: &mut EvaluationTask) -> Result<TaskOutcome> {
        task.start()?;
        let started = Instant::now();

        let graded = if task.question().trim().is_empty() {
            Err(CollaboratorError::Fatal(
                "provider returned an empty question".to_string(),
            ))
        } else {
            self.grade_with_deadline(task).await
        };
        let elapsed = started.elapsed();

        match graded {
            Ok(result) if is_valid_score(result.score) => {
                info!(
                    index = task.index(),
                    score = result.score,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Question graded"
                );
                task.succeed(result, elapsed)
            }
            Ok(result) => {
                let failure = TaskFailure::CollaboratorError {
                    reason: format!("score {} is outside the grading range", result.score),
                    transient: false,
                };
                warn!(index = task.index(), reason = %failure.reason(), "Question could not be graded");
                task.fail(failure, elapsed)
            }
            Err(err) => {
                let failure = TaskFailure::from(err);
                warn!(index = task.index(), reason = %failure.reason(), "Question could not be graded");
                task.fail(failure, elapsed)
            }
        }
    }

    async fn grade_with_deadline(
        &self,
        task: &EvaluationTask,
    ) -> std::result::Result<GradeResult, CollaboratorError> {
        let deadline: Duration = self.config.grade_timeout();
        let call = self
            .grader
            .grade(task.question(), task.reference_answer(), task.document_scope());

        match timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout(deadline)),
        }
    }
}

impl<P, G> EvaluationOrchestrator<P, G>
where
    P: TestSetProvider + 'static,
    G: GradingClient + 'static,
{
    /// Spawn a run and return a handle streaming its progress.
    ///
    /// The stream yields `RunEvent::Progress` for every processed task and
    /// ends with exactly one `RunEvent::Finished`.
    pub fn start_run(
        self: Arc<Self>,
        selection: DocumentSelection,
        sample_count: usize,
    ) -> RunHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let join = tokio::spawn(async move {
            let sink = ChannelSink::new(tx.clone());
            let result = self.run(&selection, sample_count, &sink, &token).await;
            let _ = tx.send(RunEvent::Finished(result));
        });

        RunHandle {
            events: rx,
            cancel,
            join,
        }
    }
}

/// Caller's view of a spawned run.
pub struct RunHandle {
    events: mpsc::UnboundedReceiver<RunEvent>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl RunHandle {
    /// Next event, or `None` once the final report has been delivered.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Ask the run to stop before its next task.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain remaining progress events and return the final report.
    pub async fn finish(mut self) -> Result<EvaluationRun> {
        while let Some(event) = self.events.recv().await {
            if let RunEvent::Finished(result) = event {
                return result;
            }
        }

        match self.join.await {
            Ok(()) => Err(EvalError::Aborted(
                "run ended without a final report".to_string(),
            )),
            Err(err) => Err(EvalError::Aborted(err.to_string())),
        }
    }
}
