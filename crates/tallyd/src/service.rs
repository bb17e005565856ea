//! Request orchestration: register and check flows over the core engines.

use crate::engine::{EmbedderHandle, EngineError};
use chrono::Utc;
use tally_core::{AttendanceEvent, AttendanceStatus, CosineMatcher, Identity, Matcher};
use tally_model::EmbedError;
use tally_store::{AttendanceLedger, IdentityStore, StoreError, ToggleEngine};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed request: rejected immediately, never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no face detected in any provided frame")]
    NoFaceDetected,
    /// Retryable: the caller may try again.
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("embedding engine failed: {0}")]
    Engine(String),
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Embed(EmbedError::InvalidImage(msg)) => {
                ServiceError::InvalidInput(format!("undecodable image: {msg}"))
            }
            other => ServiceError::Engine(other.to_string()),
        }
    }
}

/// Result of a check request.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The model found no face in the frame.
    NoFace,
    /// A face was found but nothing in the gallery is close enough.
    Unrecognized,
    /// Matched and toggled.
    Recognized {
        identity_id: String,
        display_name: String,
        status: AttendanceStatus,
        similarity: f32,
    },
}

/// Stateless per-request orchestrator. Shared across handlers; holds no
/// mutable state of its own beyond the engines it delegates to.
pub struct RecognitionService {
    embedder: EmbedderHandle,
    matcher: CosineMatcher,
    identities: IdentityStore,
    ledger: AttendanceLedger,
    toggles: ToggleEngine,
    threshold: f32,
}

impl RecognitionService {
    pub fn new(
        embedder: EmbedderHandle,
        identities: IdentityStore,
        ledger: AttendanceLedger,
        toggles: ToggleEngine,
        threshold: f32,
    ) -> Self {
        let matcher = CosineMatcher::new(embedder.dimension());
        Self {
            embedder,
            matcher,
            identities,
            ledger,
            toggles,
            threshold,
        }
    }

    /// Register (or re-register) an identity from a frame sequence.
    ///
    /// The stored embedding is the unit-normalized mean of the usable
    /// frames' embeddings. Fails if no frame yields a usable embedding.
    pub async fn register(
        &self,
        identity_id: String,
        display_name: String,
        frames: Vec<Vec<u8>>,
    ) -> Result<String, ServiceError> {
        if frames.is_empty() {
            return Err(ServiceError::InvalidInput("no frames provided".into()));
        }
        let frame_count = frames.len();

        let embedding = self
            .embedder
            .embed_aggregate(frames)
            .await?
            .ok_or(ServiceError::NoFaceDetected)?;

        self.identities
            .upsert(&Identity {
                id: identity_id.clone(),
                display_name,
                embedding,
            })
            .await?;

        tracing::info!(identity_id = %identity_id, frames = frame_count, "identity registered");
        Ok(identity_id)
    }

    /// Recognize the face in one frame and toggle attendance on a match.
    pub async fn check(&self, frame: Vec<u8>) -> Result<CheckOutcome, ServiceError> {
        let Some(embedding) = self.embedder.embed(frame).await? else {
            return Ok(CheckOutcome::NoFace);
        };

        let gallery = self.identities.get_all().await?;
        let best = self
            .matcher
            .find_best_match(&embedding, &gallery, self.threshold)
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        let Some(best) = best else {
            return Ok(CheckOutcome::Unrecognized);
        };

        // The match came out of this gallery, so the lookup cannot miss.
        let display_name = gallery
            .iter()
            .find(|i| i.id == best.identity_id)
            .map(|i| i.display_name.clone())
            .unwrap_or_default();

        let status = self.toggles.toggle(&best.identity_id, Utc::now()).await?;

        tracing::info!(
            identity_id = %best.identity_id,
            similarity = best.similarity,
            status = %status,
            "check recognized"
        );
        Ok(CheckOutcome::Recognized {
            identity_id: best.identity_id,
            display_name,
            status,
            similarity: best.similarity,
        })
    }

    /// (id, display name) of every registered identity, insertion order.
    pub async fn list_identities(&self) -> Result<Vec<(String, String)>, ServiceError> {
        let gallery = self.identities.get_all().await?;
        Ok(gallery.into_iter().map(|i| (i.id, i.display_name)).collect())
    }

    /// Recent attendance events, newest first.
    pub async fn attendance_log(
        &self,
        limit: u32,
    ) -> Result<Vec<(AttendanceEvent, Option<String>)>, ServiceError> {
        Ok(self.ledger.recent(limit).await?)
    }

    pub async fn identity_count(&self) -> Result<u64, ServiceError> {
        Ok(self.identities.count().await?)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn dimension(&self) -> usize {
        self.matcher.dimension()
    }
}
