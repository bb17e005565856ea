//! ONNX-backed face embedder.
//!
//! Wraps a single end-to-end face pipeline model (detection and embedding
//! fused, as shipped in the `buffalo_l` package): the graph takes a full
//! RGB frame and emits one 512-dimensional embedding row per detected
//! face, ordered by the model's own face ranking. Zero rows means no face.

use crate::embedder::{EmbedError, Embedder};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use tally_core::Embedding;

const MODEL_INPUT_SIZE: usize = 640;
const MODEL_MEAN: f32 = 127.5;
const MODEL_STD: f32 = 128.0;
const MODEL_EMBEDDING_DIM: usize = 512;
const MODEL_FILE: &str = "buffalo_l.onnx";

/// System-wide default location for the face model.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("/usr/share/tally/models")
}

/// File name of the bundled face pipeline model.
pub fn model_file_name() -> &'static str {
    MODEL_FILE
}

/// Face embedder backed by ONNX Runtime.
///
/// Model state is read-only after `load`; the session is `&mut` only
/// because inference reuses internal scratch buffers.
pub struct OnnxEmbedder {
    session: Session,
}

impl OnnxEmbedder {
    /// Load the face pipeline model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EmbedError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face model"
        );

        Ok(Self { session })
    }

    /// Preprocess a 640x640 RGB frame into a NCHW float tensor with
    /// symmetric (x - 127.5) / 128 normalization.
    fn preprocess(frame: &RgbImage) -> Array4<f32> {
        let size = MODEL_INPUT_SIZE;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for (x, y, pixel) in frame.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (pixel.0[c] as f32 - MODEL_MEAN) / MODEL_STD;
            }
        }

        tensor
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&mut self, image: &[u8]) -> Result<Option<Embedding>, EmbedError> {
        let decoded = image::load_from_memory(image)
            .map_err(|e| EmbedError::InvalidImage(e.to_string()))?;
        let frame = image::imageops::resize(
            &decoded.to_rgb8(),
            MODEL_INPUT_SIZE as u32,
            MODEL_INPUT_SIZE as u32,
            image::imageops::FilterType::Triangle,
        );

        let input = Self::preprocess(&frame);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedError::InferenceFailed(format!("embedding output: {e}")))?;

        // One row per detected face; no rows means no face in the frame.
        if raw.is_empty() {
            return Ok(None);
        }
        if raw.len() % MODEL_EMBEDDING_DIM != 0 {
            return Err(EmbedError::InferenceFailed(format!(
                "output length {} is not a multiple of the {MODEL_EMBEDDING_DIM}-dim embedding",
                raw.len()
            )));
        }

        // Row 0 is the model's primary face.
        let primary = Embedding::new(raw[..MODEL_EMBEDDING_DIM].to_vec());
        // A zero-norm row carries no direction; treat it as no usable face.
        Ok(primary.normalized())
    }

    fn dimension(&self) -> usize {
        MODEL_EMBEDDING_DIM
    }
}
