//! Document QA Eval - an evaluation harness for a retrieval-augmented
//! document question-answering service.
//!
//! # Overview
//!
//! The QA service answers questions over uploaded PDFs. This crate measures
//! how well it does:
//! 1. Ask the service for a synthetic test set of question/reference-answer
//!    pairs drawn from a chosen set of documents
//! 2. Submit each question for grading, strictly one at a time
//! 3. Keep a running average score, publishing a progress snapshot after
//!    every question, and isolate per-question failures
//!
//! # Quick Start
//!
//! ```no_run
//! use docqa_eval::{
//!     config::Config,
//!     eval::{DocumentSelection, EvaluationOrchestrator, FnSink, ProgressSnapshot},
//!     service::QaServiceClient,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     // The QA service both generates and grades
//!     let client = QaServiceClient::new(config.service.clone());
//!     let orchestrator =
//!         EvaluationOrchestrator::new(client.clone(), client, config.evaluation.clone());
//!
//!     let selection = DocumentSelection::new(["report.pdf"])?;
//!     let sink = FnSink(|s: ProgressSnapshot| {
//!         println!("{}/{} avg={:?}", s.current(), s.total_tasks, s.average_score)
//!     });
//!
//!     let run = orchestrator
//!         .run(&selection, 20, &sink, &CancellationToken::new())
//!         .await?;
//!
//!     run.print_summary();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **EvaluationOrchestrator**: drives a run, isolates failures, pushes snapshots
//! - **EvaluationTask**: one question and its Pending/Running/terminal state
//! - **ScoreAccumulator**: completed/failed counts and the running average
//! - **TestSetProvider / GradingClient**: the external service contracts
//! - **QaServiceClient**: HTTP implementation of both contracts

pub mod config;
pub mod error;
pub mod eval;
pub mod persistence;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use error::{CollaboratorError, EvalError, Result};
pub use eval::{
    DocumentSelection, EvaluationOrchestrator, EvaluationRun, ProgressSink, ProgressSnapshot,
};
pub use persistence::{load_report, save_report};
pub use service::QaServiceClient;
