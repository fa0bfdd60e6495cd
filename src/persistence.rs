//! Persistence layer for evaluation reports and test sets.
//!
//! Reports support both JSON (human-readable) and bincode (efficient binary)
//! formats. Test sets are always JSON so they can be edited by hand.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::error::{EvalError, Result};
use crate::eval::run::EvaluationRun;
use crate::eval::test_set::TestSet;

/// Default filename for a saved report.
pub const DEFAULT_REPORT_FILENAME: &str = "evaluation_results.json";

/// Default filename for a saved test set.
pub const DEFAULT_TEST_SET_FILENAME: &str = "test_set.json";

/// Save format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SaveFormat::Json,
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json, // Default to JSON
        }
    }
}

/// Save an evaluation report to a file.
pub fn save_report(run: &EvaluationRun, path: &Path) -> Result<()> {
    save_report_with_format(run, path, SaveFormat::from_path(path))
}

/// Save an evaluation report with specific format.
pub fn save_report_with_format(run: &EvaluationRun, path: &Path, format: SaveFormat) -> Result<()> {
    let data = match format {
        SaveFormat::Json => to_json_bytes(run)?,
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            bincode::encode_to_vec(run, config)
                .map_err(|e| EvalError::Serialization(e.to_string()))?
        }
    };

    write_file(path, &data)
}

/// Load an evaluation report from a file.
pub fn load_report(path: &Path) -> Result<EvaluationRun> {
    if !path.exists() {
        return Err(EvalError::NotFound(path.to_path_buf()));
    }

    let data = fs::read(path).map_err(|e| EvalError::io(path, e))?;

    match SaveFormat::from_path(path) {
        SaveFormat::Json => from_json_bytes(&data),
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            let (run, _): (EvaluationRun, usize) = bincode::decode_from_slice(&data, config)
                .map_err(|e| EvalError::Serialization(e.to_string()))?;
            Ok(run)
        }
    }
}

/// Save a test set as JSON.
pub fn save_test_set(test_set: &TestSet, path: &Path) -> Result<()> {
    write_file(path, &to_json_bytes(test_set)?)
}

/// Load a test set from JSON.
pub fn load_test_set(path: &Path) -> Result<TestSet> {
    if !path.exists() {
        return Err(EvalError::NotFound(path.to_path_buf()));
    }

    let data = fs::read(path).map_err(|e| EvalError::io(path, e))?;
    from_json_bytes(&data)
}

/// Check if a file exists at the given path.
pub fn file_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}

fn to_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| EvalError::Serialization(e.to_string()))
}

fn from_json_bytes<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| EvalError::Serialization(e.to_string()))
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
    }

    fs::write(path, data).map_err(|e| EvalError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::collaborator::TestItem;
    use crate::eval::selection::DocumentSelection;
    use crate::eval::task::{EvaluationTask, GradeResult, TaskFailure};
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_report() -> EvaluationRun {
        let scope = DocumentSelection::new(["a.pdf", "b.pdf"]).unwrap();
        let tasks = vec![
            EvaluationTask::new(0, "What is X?", "X is Y", scope.clone()),
            EvaluationTask::new(1, "Who wrote Z?", "Alice", scope.clone()),
            EvaluationTask::new(2, "When?", "1991", scope.clone()),
        ];
        let mut run = EvaluationRun::new(scope, tasks);

        run.tasks[0].start().unwrap();
        let outcome = run.tasks[0]
            .succeed(
                GradeResult {
                    generated_answer: "X is Y.".to_string(),
                    relevant_chunks: vec!["X is Y, says the doc".to_string()],
                    score: 5.0,
                    feedback: Some("Score: 5\nReasoning: exact".to_string()),
                },
                Duration::from_millis(840),
            )
            .unwrap();
        run.accumulator.record(outcome);

        run.tasks[1].start().unwrap();
        let outcome = run.tasks[1]
            .fail(
                TaskFailure::Timeout { after_ms: 30_000 },
                Duration::from_secs(30),
            )
            .unwrap();
        run.accumulator.record(outcome);

        run.cancelled = true;
        run.elapsed_ms = 31_000;
        run
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");

        let original = create_test_report();
        save_report(&original, &path).unwrap();
        assert!(file_exists(&path));

        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.average_score(), Some(5.0));
        assert_eq!(loaded.pending().count(), 1);
    }

    #[test]
    fn test_save_and_load_bincode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("report.bin");

        let original = create_test_report();
        save_report(&original, &path).unwrap();

        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(SaveFormat::from_path(Path::new("r.json")), SaveFormat::Json);
        assert_eq!(SaveFormat::from_path(Path::new("r.bin")), SaveFormat::Bincode);
        assert_eq!(
            SaveFormat::from_path(Path::new("r.bincode")),
            SaveFormat::Bincode
        );
        assert_eq!(SaveFormat::from_path(Path::new("r")), SaveFormat::Json);
    }

    #[test]
    fn test_load_nonexistent() {
        let result = load_report(Path::new("/nonexistent/report.json"));
        assert!(matches!(result, Err(EvalError::NotFound(_))));
    }

    #[test]
    fn test_test_set_json_uses_wire_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_TEST_SET_FILENAME);

        let test_set = TestSet::new(
            DocumentSelection::new(["a.pdf"]).unwrap(),
            vec![TestItem::new("What is X?", "X is Y")],
        );
        save_test_set(&test_set, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"true_answer\""));
        assert_eq!(load_test_set(&path).unwrap(), test_set);
    }
}
