//! Saved test sets, replayable as a [`TestSetProvider`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::collaborator::{TestItem, TestSetProvider};
use super::selection::DocumentSelection;
use crate::error::{CollaboratorError, Result};
use crate::persistence;

/// A generated batch of questions together with the documents it was drawn from.
///
/// Also reads the bare item array written by the QA service's own
/// generation script, which records no selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TestSetFile")]
pub struct TestSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_selection: Option<DocumentSelection>,
    pub items: Vec<TestItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TestSetFile {
    Bare(Vec<TestItem>),
    Described {
        #[serde(default)]
        document_selection: Option<DocumentSelection>,
        items: Vec<TestItem>,
    },
}

impl From<TestSetFile> for TestSet {
    fn from(file: TestSetFile) -> Self {
        match file {
            TestSetFile::Bare(items) => Self {
                document_selection: None,
                items,
            },
            TestSetFile::Described {
                document_selection,
                items,
            } => Self {
                document_selection,
                items,
            },
        }
    }
}

impl TestSet {
    pub fn new(document_selection: DocumentSelection, items: Vec<TestItem>) -> Self {
        Self {
            document_selection: Some(document_selection),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Serves questions from a saved test set instead of asking the QA service.
///
/// Items that name a `source_file` outside the requested selection are
/// skipped; items without one are always eligible.
#[derive(Debug, Clone)]
pub struct FileTestSetProvider {
    test_set: TestSet,
}

impl FileTestSetProvider {
    pub fn new(test_set: TestSet) -> Self {
        Self { test_set }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(persistence::load_test_set(path)?))
    }

    pub fn test_set(&self) -> &TestSet {
        &self.test_set
    }
}

#[async_trait]
impl TestSetProvider for FileTestSetProvider {
    async fn generate(
        &self,
        selection: &DocumentSelection,
        sample_count: usize,
    ) -> std::result::Result<Vec<TestItem>, CollaboratorError> {
        let items: Vec<TestItem> = self
            .test_set
            .items
            .iter()
            .filter(|item| {
                item.source_file
                    .as_deref()
                    .is_none_or(|source| selection.contains(source))
            })
            .take(sample_count)
            .cloned()
            .collect();

        debug!(
            available = self.test_set.len(),
            served = items.len(),
            "Serving saved test set"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(question: &str, source: Option<&str>) -> TestItem {
        TestItem {
            question: question.to_string(),
            reference_answer: "answer".to_string(),
            source_chunk: None,
            source_file: source.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_filters_by_source_and_limits() {
        let all = DocumentSelection::new(["a.pdf", "b.pdf"]).unwrap();
        let provider = FileTestSetProvider::new(TestSet::new(
            all,
            vec![
                item("from a", Some("a.pdf")),
                item("from b", Some("b.pdf")),
                item("unknown", None),
                item("from a again", Some("a.pdf")),
            ],
        ));

        let only_a = DocumentSelection::new(["a.pdf"]).unwrap();
        let served = provider.generate(&only_a, 10).await.unwrap();
        let questions: Vec<_> = served.iter().map(|i| i.question.as_str()).collect();
        assert_eq!(questions, vec!["from a", "unknown", "from a again"]);

        let limited = provider.generate(&only_a, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_loads_bare_item_array() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test_set.json");
        std::fs::write(
            &path,
            r#"[
                {"question": "Q1?", "true_answer": "A1", "source_chunk": "chunk one", "source_file": "a.pdf"},
                {"question": "Q2?", "true_answer": "A2", "source_chunk": "chunk two", "source_file": "b.pdf"}
            ]"#,
        )
        .unwrap();

        let provider = FileTestSetProvider::load(&path).unwrap();
        assert!(provider.test_set().document_selection.is_none());
        assert_eq!(provider.test_set().len(), 2);
        assert_eq!(
            provider.test_set().items[0].source_chunk.as_deref(),
            Some("chunk one")
        );

        let only_a = DocumentSelection::new(["a.pdf"]).unwrap();
        let served = provider.generate(&only_a, 10).await.unwrap();
        assert_eq!(served.len(), 1);
        assert_eq!(served[0].question, "Q1?");
    }

    #[test]
    fn test_rejects_invalid_selection() {
        let empty = serde_json::from_str::<TestSet>(r#"{"document_selection": [], "items": []}"#);
        assert!(empty.is_err());

        let blank =
            serde_json::from_str::<TestSet>(r#"{"document_selection": ["  "], "items": []}"#);
        assert!(blank.is_err());
    }

    #[tokio::test]
    async fn test_no_matching_items_is_empty_not_error() {
        let provider = FileTestSetProvider::new(TestSet::new(
            DocumentSelection::new(["a.pdf"]).unwrap(),
            vec![item("from a", Some("a.pdf"))],
        ));
        let other = DocumentSelection::new(["z.pdf"]).unwrap();
        let served = tokio_test::assert_ok!(provider.generate(&other, 5).await);
        assert!(served.is_empty());
    }
}
