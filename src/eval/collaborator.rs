//! Contracts for the external services the harness drives.
//!
//! The harness never generates questions or computes scores itself. It asks a
//! [`TestSetProvider`] for question/answer pairs and a [`GradingClient`] to
//! answer and score each one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::selection::DocumentSelection;
use super::task::GradeResult;
use crate::error::CollaboratorError;

/// A generated question with its reference answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    pub question: String,
    /// Reference ("gold") answer. Named `true_answer` on the wire.
    #[serde(rename = "true_answer")]
    pub reference_answer: String,
    /// Passage the question was generated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_chunk: Option<String>,
    /// Document the question was drawn from, if the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl TestItem {
    pub fn new(question: impl Into<String>, reference_answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            reference_answer: reference_answer.into(),
            source_chunk: None,
            source_file: None,
        }
    }
}

/// Produces a batch of questions for a document selection.
///
/// May return fewer items than requested. An empty vector means "no data".
#[async_trait]
pub trait TestSetProvider: Send + Sync {
    async fn generate(
        &self,
        selection: &DocumentSelection,
        sample_count: usize,
    ) -> Result<Vec<TestItem>, CollaboratorError>;
}

/// Answers one question against the selection and scores it against the reference.
#[async_trait]
pub trait GradingClient: Send + Sync {
    async fn grade(
        &self,
        question: &str,
        reference_answer: &str,
        selection: &DocumentSelection,
    ) -> Result<GradeResult, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_wire_names() {
        let item: TestItem =
            serde_json::from_str(r#"{"question": "Q?", "true_answer": "A", "source_chunk": "..."}"#)
                .unwrap();
        assert_eq!(item.reference_answer, "A");
        assert_eq!(item.source_chunk.as_deref(), Some("..."));
        assert!(item.source_file.is_none());

        let json = serde_json::to_value(TestItem::new("Q?", "A")).unwrap();
        assert_eq!(json["true_answer"], "A");
        assert!(json.get("source_chunk").is_none());
        assert!(json.get("source_file").is_none());
    }
}
