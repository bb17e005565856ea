//! tally-model — Face embedding extraction via ONNX Runtime.
//!
//! The face model is an opaque collaborator: image bytes go in, an
//! embedding (or nothing, when no face is present) comes out. Detection
//! internals live inside the model graph, not in this crate.

pub mod embedder;
pub mod onnx;

pub use embedder::{aggregate, EmbedError, Embedder};
pub use onnx::{default_model_dir, model_file_name, OnnxEmbedder};
