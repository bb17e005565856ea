//! Best-match search over a gallery of stored identities.

use crate::types::{Embedding, Identity};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MatchError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// The winning gallery entry and its cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct BestMatch {
    pub identity_id: String,
    pub similarity: f32,
}

/// Strategy for finding the gallery identity closest to a query embedding.
pub trait Matcher {
    fn find_best_match(
        &self,
        query: &Embedding,
        gallery: &[Identity],
        threshold: f32,
    ) -> Result<Option<BestMatch>, MatchError>;
}

/// Cosine similarity matcher over the full gallery.
///
/// Always scans every entry — similarity is not monotonic in enumeration
/// order, so there is no early exit. Ties on the maximum go to the entry
/// encountered first in enumeration order.
pub struct CosineMatcher {
    dimension: usize,
}

impl CosineMatcher {
    /// A matcher for the deployment's fixed embedding dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl Matcher for CosineMatcher {
    fn find_best_match(
        &self,
        query: &Embedding,
        gallery: &[Identity],
        threshold: f32,
    ) -> Result<Option<BestMatch>, MatchError> {
        if query.len() != self.dimension {
            return Err(MatchError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        // A zero-norm query cannot be normalized: nothing can match it.
        let Some(unit_query) = query.normalized() else {
            return Ok(None);
        };

        let mut best_sim = f32::NEG_INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, identity) in gallery.iter().enumerate() {
            if identity.embedding.len() != self.dimension {
                tracing::warn!(
                    identity_id = %identity.id,
                    len = identity.embedding.len(),
                    expected = self.dimension,
                    "skipping identity with mismatched embedding dimension"
                );
                continue;
            }
            // Zero-norm stored embeddings are unmatchable, skip them.
            let Some(unit_stored) = identity.embedding.normalized() else {
                continue;
            };
            let sim = unit_query.dot(&unit_stored);
            // Strict `>` keeps the first occurrence of the maximum.
            if sim > best_sim {
                best_sim = sim;
                best_idx = Some(i);
            }
        }

        match best_idx {
            // Threshold boundary is inclusive: equality is a match.
            Some(idx) if best_sim >= threshold => Ok(Some(BestMatch {
                identity_id: gallery[idx].id.clone(),
                similarity: best_sim,
            })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str, values: Vec<f32>) -> Identity {
        Identity {
            id: id.to_string(),
            display_name: id.to_string(),
            embedding: Embedding::new(values),
        }
    }

    #[test]
    fn test_best_match_picks_closest() {
        let matcher = CosineMatcher::new(3);
        let gallery = vec![
            identity("a", vec![0.0, 1.0, 0.0]),
            identity("b", vec![0.0, 0.0, 1.0]),
            identity("c", vec![1.0, 0.0, 0.0]),
        ];
        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let m = matcher.find_best_match(&query, &gallery, 0.5).unwrap().unwrap();
        assert_eq!(m.identity_id, "c");
        assert!((m.similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similarity_symmetric() {
        let a = Embedding::new(vec![0.3, 0.7, -0.2]).normalized().unwrap();
        let b = Embedding::new(vec![-0.1, 0.4, 0.9]).normalized().unwrap();
        assert_eq!(a.dot(&b), b.dot(&a));
    }

    #[test]
    fn test_self_similarity_near_one() {
        let matcher = CosineMatcher::new(4);
        let gallery = vec![identity("a", vec![0.1, -2.3, 4.5, 0.01])];
        let query = Embedding::new(vec![0.1, -2.3, 4.5, 0.01]);
        let m = matcher.find_best_match(&query, &gallery, 0.0).unwrap().unwrap();
        assert!((m.similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_threshold_boundary_inclusive() {
        let matcher = CosineMatcher::new(2);
        // query [3,4] vs stored [1,0]: similarity is exactly 3/5 in f32.
        let gallery = vec![identity("a", vec![1.0, 0.0])];
        let query = Embedding::new(vec![3.0, 4.0]);
        let sim = 3.0f32 / 5.0f32;

        let at = matcher.find_best_match(&query, &gallery, sim).unwrap();
        assert!(at.is_some(), "similarity equal to threshold must match");

        // One ULP above the achieved similarity must not match.
        let above = f32::from_bits(sim.to_bits() + 1);
        let none = matcher.find_best_match(&query, &gallery, above).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_tie_goes_to_first_in_enumeration_order() {
        let matcher = CosineMatcher::new(2);
        // Same direction, different magnitudes: identical similarity.
        let gallery = vec![
            identity("first", vec![2.0, 0.0]),
            identity("second", vec![5.0, 0.0]),
        ];
        let query = Embedding::new(vec![1.0, 0.0]);
        let m = matcher.find_best_match(&query, &gallery, 0.5).unwrap().unwrap();
        assert_eq!(m.identity_id, "first");
    }

    #[test]
    fn test_empty_gallery_no_match() {
        let matcher = CosineMatcher::new(2);
        let query = Embedding::new(vec![1.0, 0.0]);
        assert!(matcher.find_best_match(&query, &[], 0.0).unwrap().is_none());
    }

    #[test]
    fn test_zero_norm_query_no_match() {
        let matcher = CosineMatcher::new(2);
        let gallery = vec![identity("a", vec![1.0, 0.0])];
        let query = Embedding::new(vec![0.0, 0.0]);
        assert!(matcher.find_best_match(&query, &gallery, -1.0).unwrap().is_none());
    }

    #[test]
    fn test_zero_norm_stored_skipped() {
        let matcher = CosineMatcher::new(2);
        let gallery = vec![
            identity("zero", vec![0.0, 0.0]),
            identity("real", vec![1.0, 0.0]),
        ];
        let query = Embedding::new(vec![1.0, 0.0]);
        let m = matcher.find_best_match(&query, &gallery, 0.5).unwrap().unwrap();
        assert_eq!(m.identity_id, "real");
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let matcher = CosineMatcher::new(3);
        let query = Embedding::new(vec![1.0, 0.0]);
        let err = matcher.find_best_match(&query, &[], 0.5).unwrap_err();
        assert_eq!(err, MatchError::DimensionMismatch { expected: 3, actual: 2 });
    }

    #[test]
    fn test_mismatched_stored_dimension_skipped() {
        let matcher = CosineMatcher::new(2);
        let gallery = vec![
            identity("short", vec![1.0]),
            identity("ok", vec![0.0, 1.0]),
        ];
        let query = Embedding::new(vec![0.0, 1.0]);
        let m = matcher.find_best_match(&query, &gallery, 0.5).unwrap().unwrap();
        assert_eq!(m.identity_id, "ok");
    }

    #[test]
    fn test_below_threshold_no_match() {
        let matcher = CosineMatcher::new(2);
        let gallery = vec![identity("a", vec![0.0, 1.0])];
        let query = Embedding::new(vec![1.0, 0.0]);
        // Orthogonal vectors: similarity 0, below a 0.5 threshold.
        assert!(matcher.find_best_match(&query, &gallery, 0.5).unwrap().is_none());
    }
}
