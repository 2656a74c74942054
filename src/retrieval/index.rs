use std::cmp::Ordering;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::{Metadata, PassageId, SearchHit, StoredPassage, VectorIndex};
use crate::error::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read index: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse index: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("vector dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("passage {0} does not exist")]
    UnknownPassage(PassageId),

    #[error("index contains no passages")]
    Empty,
}

#[derive(Deserialize)]
struct IndexFile {
    dimension: usize,
    passages: Vec<PassageRecord>,
}

#[derive(Deserialize)]
struct PassageRecord {
    text: String,
    #[serde(default)]
    metadata: Metadata,
    vector: Vec<f32>,
}

struct Entry {
    passage: StoredPassage,
    vector: Vec<f32>,
    norm: f32,
}

/// Exact cosine-similarity index held in memory. Immutable after load, so one
/// instance can be shared by concurrent sessions behind an `Arc`.
pub struct FlatIndex {
    dimension: usize,
    entries: Vec<Entry>,
}

impl FlatIndex {
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let raw = std::fs::read_to_string(path)?;
        let index = Self::from_json_str(&raw)?;
        info!(path = %path.display(), passages = index.len(), dimension = index.dimension, "index loaded");
        Ok(index)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, IndexError> {
        let file: IndexFile = serde_json::from_str(raw)?;
        if file.passages.is_empty() {
            return Err(IndexError::Empty);
        }

        let entries = file
            .passages
            .into_iter()
            .map(|record| {
                if record.vector.len() != file.dimension {
                    return Err(IndexError::DimensionMismatch {
                        got: record.vector.len(),
                        want: file.dimension,
                    });
                }
                Ok(Entry {
                    norm: norm(&record.vector),
                    vector: record.vector,
                    passage: StoredPassage {
                        text: record.text,
                        metadata: record.metadata,
                    },
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dimension: file.dimension,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                got: vector.len(),
                want: self.dimension,
            });
        }

        let query_norm = norm(vector);
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .enumerate()
            .map(|(id, entry)| SearchHit {
                id,
                score: cosine(vector, query_norm, &entry.vector, entry.norm),
            })
            .collect();

        // Stable sort keeps storage order among equal scores.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    fn passage(&self, id: PassageId) -> Result<StoredPassage, IndexError> {
        self.entries
            .get(id)
            .map(|e| e.passage.clone())
            .ok_or(IndexError::UnknownPassage(id))
    }
}

impl VectorIndex for FlatIndex {
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, ServiceError> {
        Ok(self.nearest(vector, k)?)
    }

    async fn resolve(&self, id: PassageId) -> Result<StoredPassage, ServiceError> {
        Ok(self.passage(id)?)
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}
