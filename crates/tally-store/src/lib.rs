//! tally-store — Durable identity and attendance storage over SQLite.
//!
//! Two independently owned resources: the identity table (whole-record
//! upserts) and the append-only attendance ledger. The toggle engine sits
//! on top of the ledger and serializes its read-decide-append sequence
//! per identity.

pub mod db;
pub mod identity;
pub mod ledger;
pub mod toggle;

use thiserror::Error;

/// Storage failures, surfaced to callers as retryable.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Storage(#[from] tokio_rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub use identity::IdentityStore;
pub use ledger::AttendanceLedger;
pub use toggle::ToggleEngine;
