//! The set of documents a run evaluates against.

use bincode::de::{Decode, Decoder};
use bincode::error::DecodeError;
use bincode::{Encode, impl_borrow_decode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{EvalError, Result};

/// Non-empty, de-duplicated set of document identifiers (filenames).
///
/// Fixed before a run starts and never mutated afterwards; every task of the
/// run is answered against the same selection. Deserializing and decoding
/// go through [`DocumentSelection::new`], so loaded reports hold the same
/// guarantees as freshly built selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DocumentSelection(BTreeSet<String>);

impl DocumentSelection {
    /// Build a selection, rejecting blank identifiers and empty input.
    pub fn new<I, S>(documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for doc in documents {
            let doc = doc.into();
            let trimmed = doc.trim();
            if trimmed.is_empty() {
                return Err(EvalError::InvalidRequest(
                    "document identifiers must not be blank".to_string(),
                ));
            }
            set.insert(trimmed.to_string());
        }

        if set.is_empty() {
            return Err(EvalError::InvalidRequest(
                "document selection must not be empty".to_string(),
            ));
        }

        Ok(Self(set))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed selection; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, document: &str) -> bool {
        self.0.contains(document)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Filenames in stable order, as sent on the wire.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl TryFrom<Vec<String>> for DocumentSelection {
    type Error = EvalError;

    fn try_from(documents: Vec<String>) -> Result<Self> {
        Self::new(documents)
    }
}

impl From<DocumentSelection> for Vec<String> {
    fn from(selection: DocumentSelection) -> Self {
        selection.0.into_iter().collect()
    }
}

impl<Context> Decode<Context> for DocumentSelection {
    fn decode<D: Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        let documents: Vec<String> = Decode::decode(decoder)?;
        Self::new(documents).map_err(|e| DecodeError::OtherString(e.to_string()))
    }
}

impl_borrow_decode!(DocumentSelection);

impl fmt::Display for DocumentSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.0.iter().cloned().collect::<Vec<_>>().join(", ");
        write!(f, "{{{}}}", joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_dedups_and_orders() {
        let selection = DocumentSelection::new(["b.pdf", "a.pdf", "b.pdf"]).unwrap();
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.to_vec(), vec!["a.pdf", "b.pdf"]);
        assert!(selection.contains("a.pdf"));
        assert_eq!(selection.to_string(), "{a.pdf, b.pdf}");
    }

    #[test]
    fn test_empty_selection_rejected() {
        let result = DocumentSelection::new(Vec::<String>::new());
        assert!(matches!(result, Err(EvalError::InvalidRequest(_))));
    }

    #[test]
    fn test_blank_identifier_rejected() {
        let result = DocumentSelection::new(["a.pdf", "   "]);
        assert!(matches!(result, Err(EvalError::InvalidRequest(_))));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let selection = DocumentSelection::new(["a.pdf"]).unwrap();
        let json = serde_json::to_string(&selection).unwrap();
        assert_eq!(json, r#"["a.pdf"]"#);

        let back: DocumentSelection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, selection);
    }

    #[test]
    fn test_deserialize_rejects_empty_and_blank() {
        assert!(serde_json::from_str::<DocumentSelection>("[]").is_err());
        assert!(serde_json::from_str::<DocumentSelection>(r#"["  "]"#).is_err());
    }

    #[test]
    fn test_decode_rejects_empty() {
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(Vec::<String>::new(), config).unwrap();
        let result: std::result::Result<(DocumentSelection, usize), _> =
            bincode::decode_from_slice(&bytes, config);
        assert!(result.is_err());

        let selection = DocumentSelection::new(["b.pdf", "a.pdf"]).unwrap();
        let bytes = bincode::encode_to_vec(&selection, config).unwrap();
        let (decoded, _): (DocumentSelection, usize) =
            bincode::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(decoded, selection);
    }
}
