//! JSON bodies exchanged with the QA service.

use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::eval::collaborator::TestItem;
use crate::eval::task::GradeResult;

/// Response of `POST /evaluate/generate`.
///
/// The service answers `{"error": ...}` with a 200 when it has no matching
/// documents, so both fields are optional.
#[derive(Debug, Deserialize)]
pub(super) struct GenerateResponse {
    #[serde(default)]
    pub test_set: Option<Vec<TestItem>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request body for `POST /evaluate/run_single`.
#[derive(Debug, Serialize)]
pub(super) struct RunSingleRequest<'a> {
    pub question: &'a str,
    pub true_answer: &'a str,
    pub files: Vec<String>,
}

/// Response of `POST /evaluate/run_single`.
#[derive(Debug, Deserialize)]
pub(super) struct RunSingleResponse {
    #[serde(default)]
    pub generated_answer: Option<String>,
    #[serde(default)]
    pub relevant_chunks: Vec<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RunSingleResponse {
    pub(super) fn into_grade_result(self) -> Result<GradeResult, CollaboratorError> {
        if let Some(error) = self.error {
            return Err(CollaboratorError::Fatal(format!("service error: {}", error)));
        }

        let generated_answer = self.generated_answer.ok_or_else(|| {
            CollaboratorError::Fatal("response is missing generated_answer".to_string())
        })?;
        let score = self
            .score
            .ok_or_else(|| CollaboratorError::Fatal("response is missing score".to_string()))?;

        Ok(GradeResult {
            generated_answer,
            relevant_chunks: self.relevant_chunks,
            score,
            feedback: self.feedback,
        })
    }
}

/// Response of `GET /documents`.
#[derive(Debug, Deserialize)]
pub(super) struct DocumentsResponse {
    #[serde(default)]
    pub documents: Vec<String>,
}

/// FastAPI error body (`{"detail": ...}`).
#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    pub detail: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_response() {
        let body = r#"{"test_set": [
            {"question": "What is X?", "true_answer": "Y", "source_chunk": "X is Y", "source_file": "a.pdf"}
        ]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        let items = parsed.test_set.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].reference_answer, "Y");
        assert_eq!(items[0].source_file.as_deref(), Some("a.pdf"));

        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"error": "No documents found"}"#).unwrap();
        assert!(parsed.test_set.is_none());
        assert_eq!(parsed.error.as_deref(), Some("No documents found"));
    }

    #[test]
    fn test_run_single_request_shape() {
        let request = RunSingleRequest {
            question: "Q?",
            true_answer: "A",
            files: vec!["a.pdf".to_string()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"question": "Q?", "true_answer": "A", "files": ["a.pdf"]})
        );
    }

    #[test]
    fn test_run_single_response_success() {
        let body = r#"{
            "question": "Q?", "true_answer": "A", "generated_answer": "A.",
            "score": 4, "feedback": "Score: 4", "relevant_chunks": ["c1", "c2"]
        }"#;
        let parsed: RunSingleResponse = serde_json::from_str(body).unwrap();
        let result = parsed.into_grade_result().unwrap();
        assert_eq!(result.score, 4.0);
        assert_eq!(result.relevant_chunks, vec!["c1", "c2"]);
        assert_eq!(result.feedback.as_deref(), Some("Score: 4"));
    }

    #[test]
    fn test_run_single_response_error_body() {
        let parsed: RunSingleResponse =
            serde_json::from_str(r#"{"error": "LLM quota exceeded"}"#).unwrap();
        let err = parsed.into_grade_result().unwrap_err();
        assert_eq!(
            err,
            CollaboratorError::Fatal("service error: LLM quota exceeded".to_string())
        );
    }

    #[test]
    fn test_run_single_response_missing_score() {
        let parsed: RunSingleResponse =
            serde_json::from_str(r#"{"generated_answer": "A."}"#).unwrap();
        assert!(parsed.into_grade_result().is_err());
    }
}
