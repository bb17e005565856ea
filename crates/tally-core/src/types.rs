use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Face embedding vector (512-dimensional for the default model).
///
/// Stored embeddings are kept exactly as the model produced them;
/// normalization happens at comparison time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// L2 norm of the vector.
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Return a unit-norm copy, or `None` if the norm is zero
    /// (a zero vector has no direction to compare).
    pub fn normalized(&self) -> Option<Embedding> {
        let norm = self.norm();
        if norm > 0.0 {
            Some(Embedding::new(self.values.iter().map(|x| x / norm).collect()))
        } else {
            None
        }
    }

    /// Dot product. For two unit vectors this is cosine similarity in [-1, 1].
    pub fn dot(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Element-wise arithmetic mean of a set of same-length embeddings,
    /// re-normalized to unit length.
    ///
    /// This is the registration aggregation policy: mean first, then
    /// normalize the mean. Returns `None` for an empty set or a zero-norm
    /// mean.
    pub fn mean_normalized(embeddings: &[Embedding]) -> Option<Embedding> {
        let first = embeddings.first()?;
        let dim = first.len();
        let mut sum = vec![0.0f64; dim];
        for emb in embeddings {
            for (acc, &v) in sum.iter_mut().zip(emb.values.iter()) {
                *acc += v as f64;
            }
        }
        let n = embeddings.len() as f64;
        let mean = Embedding::new(sum.into_iter().map(|v| (v / n) as f32).collect());
        mean.normalized()
    }
}

/// A registered person: externally assigned id, display name, raw embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub embedding: Embedding,
}

/// Attendance status recorded by a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "checkin")]
    CheckIn,
    #[serde(rename = "checkout")]
    CheckOut,
}

impl AttendanceStatus {
    /// The opposite status — one step of the toggle state machine.
    pub fn toggled(self) -> AttendanceStatus {
        match self {
            AttendanceStatus::CheckIn => AttendanceStatus::CheckOut,
            AttendanceStatus::CheckOut => AttendanceStatus::CheckIn,
        }
    }

    /// Persisted representation.
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::CheckIn => "checkin",
            AttendanceStatus::CheckOut => "checkout",
        }
    }

    pub fn parse(s: &str) -> Option<AttendanceStatus> {
        match s {
            "checkin" => Some(AttendanceStatus::CheckIn),
            "checkout" => Some(AttendanceStatus::CheckOut),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub identity_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: AttendanceStatus,
}
