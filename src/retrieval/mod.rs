//! Query encoding and nearest-passage search.
//!
//! Passages are embedded once, at index-build time, in a space shared by both
//! supported languages. Only the per-attempt query text is encoded here.

mod index;

pub use index::{FlatIndex, IndexError};

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ServiceError;

/// Position of a passage in the index's storage order.
pub type PassageId = usize;

/// Opaque key-value metadata stored alongside a passage.
pub type Metadata = Map<String, Value>;

/// Maps text to a fixed-dimension vector comparable with stored passages.
pub trait QueryEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}

/// Read-only nearest-neighbour search over stored passages.
///
/// `search` returns at most `k` hits ordered by descending score, ties broken
/// by ascending `PassageId`.
pub trait VectorIndex {
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, ServiceError>;

    async fn resolve(&self, id: PassageId) -> Result<StoredPassage, ServiceError>;
}

impl<T: VectorIndex> VectorIndex for Arc<T> {
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, ServiceError> {
        (**self).search(vector, k).await
    }

    async fn resolve(&self, id: PassageId) -> Result<StoredPassage, ServiceError> {
        (**self).resolve(id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub id: PassageId,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredPassage {
    pub text: String,
    pub metadata: Metadata,
}

/// A passage returned for one attempt, with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub id: PassageId,
    pub score: f32,
    pub text: String,
    pub metadata: Metadata,
}

const LABEL_KEYS: [&str; 3] = ["country", "title", "source"];

impl RetrievedPassage {
    /// Human-readable origin taken from the first non-empty string among the
    /// `country`, `title` and `source` metadata keys.
    pub fn label(&self) -> Option<&str> {
        LABEL_KEYS.iter().find_map(|key| {
            self.metadata
                .get(*key)?
                .as_str()
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_index() -> FlatIndex {
        FlatIndex::from_json_str(
            r#"{
                "dimension": 2,
                "passages": [
                    {"text": "east", "metadata": {"country": "Jordan"}, "vector": [1.0, 0.0]},
                    {"text": "north", "vector": [0.0, 1.0]},
                    {"text": "north-east", "vector": [0.7, 0.7]}
                ]
            }"#,
        )
        .unwrap()
    }

    fn passage_with(metadata: serde_json::Value) -> RetrievedPassage {
        RetrievedPassage {
            id: 0,
            score: 0.5,
            text: "text".into(),
            metadata: serde_json::from_value(metadata).unwrap(),
        }
    }

    #[test]
    fn label_prefers_country_then_title() {
        let both = passage_with(serde_json::json!({"country": "Jordan", "title": "Petra"}));
        assert_eq!(both.label(), Some("Jordan"));

        let title_only = passage_with(serde_json::json!({"country": "  ", "title": "Petra"}));
        assert_eq!(title_only.label(), Some("Petra"));
    }

    #[test]
    fn label_ignores_non_string_values() {
        let p = passage_with(serde_json::json!({"country": 962, "page": 4}));
        assert_eq!(p.label(), None);
    }

    #[tokio::test]
    async fn shared_index_searches_and_resolves() {
        let index = Arc::new(small_index());
        let hits = index.search(&[1.0, 0.1], 2).await.unwrap();

        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![0, 2]);
        assert!(hits[0].score >= hits[1].score);

        let stored = index.resolve(hits[0].id).await.unwrap();
        assert_eq!(stored.text, "east");
        assert_eq!(stored.metadata["country"], "Jordan");
    }

    #[tokio::test]
    async fn search_propagates_dimension_mismatch() {
        let index = small_index();
        let err = index.search(&[1.0, 0.0, 0.0], 2).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Index(IndexError::DimensionMismatch { got: 3, want: 2 })
        ));
    }
}
