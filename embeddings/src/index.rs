//! Flat (exact) nearest-neighbor index over food-name embeddings.
//!
//! Vectors are addressed by their insertion slot. The index is append-only:
//! there is no update-in-place and no delete-by-slot. Callers that need to
//! retire a slot filter it out at search time via [`FlatIndex::search_filtered`].

use std::path::Path;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::{Neighbor, squared_l2};

/// On-disk layout of the index file.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    dimension: usize,
    vectors: Vec<Embedding>,
}

impl IndexFile {
    const CURRENT_VERSION: u32 = 1;
}

/// Exact squared-L2 index with insertion-order slots.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    /// Stored vectors; position is the slot id.
    vectors: Vec<Embedding>,

    /// Expected dimension of every vector.
    dimension: usize,
}

impl FlatIndex {
    /// Create an empty index.
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Vec::new(),
            dimension,
        }
    }

    /// Dimension of stored vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of slots, live or not.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vector stored at `slot`.
    pub fn get(&self, slot: usize) -> Option<&Embedding> {
        self.vectors.get(slot)
    }

    /// Append a vector and return its slot.
    pub fn add(&mut self, embedding: Embedding) -> Result<usize> {
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let slot = self.vectors.len();
        self.vectors.push(embedding);
        debug!("Appended vector at slot {slot}");
        Ok(slot)
    }

    /// Up to `k` nearest slots by ascending squared distance.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.search_filtered(query, k, |_| true)
    }

    /// Like [`FlatIndex::search`], but slots rejected by `keep` are never returned.
    ///
    /// Ties are broken by the lower slot so results are deterministic.
    pub fn search_filtered<F>(&self, query: &[f32], k: usize, keep: F) -> Result<Vec<Neighbor>>
    where
        F: Fn(usize) -> bool,
    {
        if query.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(OrderedFloat<f32>, usize)> = Vec::with_capacity(self.vectors.len());
        for (slot, vector) in self.vectors.iter().enumerate() {
            if keep(slot) {
                scored.push((OrderedFloat(squared_l2(query, vector)?), slot));
            }
        }

        scored.sort_unstable();

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, slot)| Neighbor {
                slot,
                distance: distance.0,
            })
            .collect())
    }

    /// Drop every vector.
    pub fn clear(&mut self) {
        self.vectors.clear();
        info!("Cleared vector index");
    }

    /// Encode the index into its binary file format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let file = IndexFile {
            version: IndexFile::CURRENT_VERSION,
            dimension: self.dimension,
            vectors: self.vectors.clone(),
        };
        bincode::serialize(&file).map_err(EmbeddingError::from)
    }

    /// Decode an index, rejecting files written for another dimension.
    pub fn from_bytes(bytes: &[u8], dimension: usize) -> Result<Self> {
        let file: IndexFile = bincode::deserialize(bytes)?;

        if file.version != IndexFile::CURRENT_VERSION {
            return Err(EmbeddingError::IndexFormat(format!(
                "unsupported index version {}",
                file.version
            )));
        }

        if file.dimension != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: file.dimension,
            });
        }

        if let Some(bad) = file.vectors.iter().find(|v| v.len() != dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        Ok(Self {
            vectors: file.vectors,
            dimension,
        })
    }

    /// Write the index to `path` through a temp file and rename.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let temp_path = path.with_extension("tmp");

        fs::write(&temp_path, &bytes).await?;
        fs::rename(&temp_path, path).await?;

        debug!("Saved {} vectors to {}", self.len(), path.display());
        Ok(())
    }

    /// Load the index from `path`.
    pub async fn load(path: &Path, dimension: usize) -> Result<Self> {
        let bytes = fs::read(path).await?;
        let index = Self::from_bytes(&bytes, dimension)?;
        info!("Loaded vector index with {} vectors", index.len());
        Ok(index)
    }

    /// Load the index, or start empty when the file is absent or unusable.
    pub async fn load_or_new(path: &Path, dimension: usize) -> Self {
        if !path.exists() {
            debug!("No index at {}, starting empty", path.display());
            return Self::new(dimension);
        }

        match Self::load(path, dimension).await {
            Ok(index) => index,
            Err(e) => {
                warn!("Discarding unreadable index {}: {e}", path.display());
                Self::new(dimension)
            }
        }
    }
}
