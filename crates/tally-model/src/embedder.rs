//! The embedding extractor contract and the registration aggregation policy.

use tally_core::Embedding;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("model file not found: {0} — download the face model and place it in the model dir")]
    ModelNotFound(String),
    #[error("failed to decode image: {0}")]
    InvalidImage(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Opaque face model: image bytes in, embedding out.
///
/// `Ok(None)` means the model found no face — a normal outcome, not an
/// error. Undecodable input is `EmbedError::InvalidImage`.
pub trait Embedder {
    fn embed(&mut self, image: &[u8]) -> Result<Option<Embedding>, EmbedError>;

    /// Output dimension of this model (constant per deployment).
    fn dimension(&self) -> usize;
}

/// Aggregate one embedding from a sequence of frames.
///
/// Runs the extractor over each frame and discards the ones that fail —
/// no face and undecodable frames alike. Returns `None` when nothing
/// survives. The surviving embeddings are averaged element-wise and the
/// mean is re-normalized to unit length (mean first, then normalize).
pub fn aggregate<E: Embedder + ?Sized>(
    embedder: &mut E,
    images: &[Vec<u8>],
) -> Option<Embedding> {
    let mut collected = Vec::new();
    for (i, image) in images.iter().enumerate() {
        match embedder.embed(image) {
            Ok(Some(emb)) => collected.push(emb),
            Ok(None) => tracing::debug!(frame = i, "no face in frame, skipping"),
            Err(err) => tracing::debug!(frame = i, error = %err, "unusable frame, skipping"),
        }
    }
    tracing::debug!(usable = collected.len(), total = images.len(), "aggregating frames");
    Embedding::mean_normalized(&collected)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps the first byte of each "image" to a canned result.
    struct StubEmbedder;

    impl Embedder for StubEmbedder {
        fn embed(&mut self, image: &[u8]) -> Result<Option<Embedding>, EmbedError> {
            match image.first() {
                Some(1) => Ok(Some(Embedding::new(vec![1.0, 0.0]))),
                Some(2) => Ok(Some(Embedding::new(vec![0.0, 1.0]))),
                Some(9) => Err(EmbedError::InvalidImage("stub".into())),
                _ => Ok(None),
            }
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[test]
    fn test_aggregate_mean_then_normalize() {
        // Frames: v1, no-face, v2 — survivors are averaged then normalized.
        let frames = vec![vec![1u8], vec![0u8], vec![2u8]];
        let agg = aggregate(&mut StubEmbedder, &frames).unwrap();
        let expected =
            Embedding::mean_normalized(&[Embedding::new(vec![1.0, 0.0]), Embedding::new(vec![0.0, 1.0])])
                .unwrap();
        assert_eq!(agg, expected);
        assert!((agg.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_aggregate_discards_errors() {
        let frames = vec![vec![9u8], vec![1u8]];
        let agg = aggregate(&mut StubEmbedder, &frames).unwrap();
        assert_eq!(agg.values, vec![1.0, 0.0]);
    }

    #[test]
    fn test_aggregate_nothing_usable() {
        assert!(aggregate(&mut StubEmbedder, &[vec![0u8], vec![9u8]]).is_none());
        assert!(aggregate(&mut StubEmbedder, &[]).is_none());
    }
}
