//! tally-core — Embedding matching and the attendance toggle state machine.
//!
//! Pure types and algorithms: no I/O, no model inference, no storage.

pub mod matcher;
pub mod state;
pub mod types;

pub use matcher::{BestMatch, CosineMatcher, MatchError, Matcher};
pub use types::{AttendanceEvent, AttendanceStatus, Embedding, Identity};
