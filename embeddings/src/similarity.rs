//! Distance computations for embeddings.

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Squared euclidean distance between two embeddings.
///
/// This is the metric the flat index ranks by: smaller is closer, identical
/// vectors are at `0.0`. No square root is taken, so thresholds are expressed
/// in squared units.
pub fn squared_l2(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum())
}

/// Normalize an embedding to unit length. Zero vectors are left untouched.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// Whether every component is zero (the degraded-embedder output).
pub fn is_zero(embedding: &[f32]) -> bool {
    embedding.iter().all(|x| *x == 0.0)
}

/// A nearest-neighbor hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Insertion-order slot of the matched vector.
    pub slot: usize,

    /// Squared euclidean distance to the query.
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_squared_l2_identical() {
        let a = vec![0.5, 0.5, 0.0];
        assert_eq!(squared_l2(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_squared_l2_no_sqrt() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((squared_l2(&a, &b).unwrap() - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(squared_l2(&a, &b).is_err());
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert!(is_zero(&zero));
    }
}
