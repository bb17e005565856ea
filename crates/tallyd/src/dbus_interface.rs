use crate::service::{CheckOutcome, RecognitionService, ServiceError};
use std::sync::Arc;
use zbus::interface;

/// D-Bus interface for the Tally attendance daemon.
///
/// Bus name: org.tally.Attendance1
/// Object path: /org/tally/Attendance1
///
/// Replies are JSON strings so any client can consume them without
/// schema-specific bindings.
pub struct AttendanceInterface {
    service: Arc<RecognitionService>,
}

impl AttendanceInterface {
    pub fn new(service: Arc<RecognitionService>) -> Self {
        Self { service }
    }
}

#[interface(name = "org.tally.Attendance1")]
impl AttendanceInterface {
    /// Register an identity from an ordered sequence of frames.
    async fn register(
        &self,
        identity_id: &str,
        display_name: &str,
        frames: Vec<Vec<u8>>,
    ) -> zbus::fdo::Result<String> {
        tracing::info!(identity_id, display_name, frames = frames.len(), "register requested");
        let identity_id = self
            .service
            .register(identity_id.to_string(), display_name.to_string(), frames)
            .await
            .map_err(to_fdo)?;
        Ok(serde_json::json!({
            "message": "identity registered",
            "identity_id": identity_id,
            "success": true,
        })
        .to_string())
    }

    /// Recognize the face in one frame and toggle attendance on a match.
    async fn check(&self, frame: Vec<u8>) -> zbus::fdo::Result<String> {
        let outcome = self.service.check(frame).await.map_err(to_fdo)?;
        let payload = match outcome {
            CheckOutcome::NoFace => serde_json::json!({
                "identity_id": null,
                "name": null,
                "status": null,
                "similarity": null,
                "message": "No face detected",
            }),
            CheckOutcome::Unrecognized => serde_json::json!({
                "identity_id": null,
                "name": null,
                "status": null,
                "similarity": null,
                "message": "Face not recognised",
            }),
            CheckOutcome::Recognized {
                identity_id,
                display_name,
                status,
                similarity,
            } => serde_json::json!({
                "identity_id": identity_id,
                "name": display_name,
                "status": status.as_str(),
                "similarity": similarity,
                "message": format!("{display_name} {status}"),
            }),
        };
        Ok(payload.to_string())
    }

    /// List registered identities (id and display name).
    async fn list_identities(&self) -> zbus::fdo::Result<String> {
        let identities = self.service.list_identities().await.map_err(to_fdo)?;
        let payload: Vec<_> = identities
            .into_iter()
            .map(|(id, name)| serde_json::json!({ "identity_id": id, "name": name }))
            .collect();
        Ok(serde_json::Value::Array(payload).to_string())
    }

    /// Recent attendance events, newest first.
    async fn attendance_log(&self, limit: u32) -> zbus::fdo::Result<String> {
        let events = self.service.attendance_log(limit).await.map_err(to_fdo)?;
        let payload: Vec<_> = events
            .into_iter()
            .map(|(event, name)| {
                serde_json::json!({
                    "identity_id": event.identity_id,
                    "name": name,
                    "timestamp": event.timestamp.to_rfc3339(),
                    "status": event.status.as_str(),
                })
            })
            .collect();
        Ok(serde_json::Value::Array(payload).to_string())
    }

    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let identities = self.service.identity_count().await.map_err(to_fdo)?;
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "identities": identities,
            "similarity_threshold": self.service.threshold(),
            "embedding_dimension": self.service.dimension(),
        })
        .to_string())
    }
}

fn to_fdo(err: ServiceError) -> zbus::fdo::Error {
    match err {
        ServiceError::InvalidInput(_) | ServiceError::NoFaceDetected => {
            zbus::fdo::Error::InvalidArgs(err.to_string())
        }
        ServiceError::Storage(_) | ServiceError::Engine(_) => {
            zbus::fdo::Error::Failed(err.to_string())
        }
    }
}
