//! The attendance toggle engine: read-decide-append, serialized per identity.

use crate::ledger::AttendanceLedger;
use crate::StoreError;
use chrono::{DateTime, Local, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tally_core::{state, AttendanceEvent, AttendanceStatus};

/// Toggles attendance for an identity, atomically with respect to
/// concurrent toggles for the same identity.
///
/// Holds no attendance state of its own — the decision replays the
/// latest ledger event. Toggles for different identities never contend.
pub struct ToggleEngine {
    ledger: AttendanceLedger,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ToggleEngine {
    pub fn new(ledger: AttendanceLedger) -> Self {
        Self {
            ledger,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The per-identity lock, created on first use. The registry grows
    /// with the number of distinct identities toggled, which is bounded
    /// by the gallery size.
    fn lock_for(&self, identity_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(identity_id.to_string()).or_default().clone()
    }

    /// Record the next check-in/check-out for `identity_id` and return it.
    ///
    /// The identity id is not validated against the identity store: the
    /// ledger stays trusting and an event for an unknown id is accepted.
    /// Calendar dates are evaluated in the system time zone.
    pub async fn toggle(
        &self,
        identity_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AttendanceStatus, StoreError> {
        let lock = self.lock_for(identity_id);
        let _guard = lock.lock().await;

        let last = self.ledger.most_recent_for(identity_id).await?;
        let today = now.with_timezone(&Local).date_naive();
        let last = last.map(|e| (e.timestamp.with_timezone(&Local).date_naive(), e.status));

        let status = state::next_status(last, today);
        self.ledger
            .append(&AttendanceEvent {
                identity_id: identity_id.to_string(),
                timestamp: now,
                status,
            })
            .await?;

        tracing::info!(identity_id, status = %status, "attendance toggled");
        Ok(status)
    }
}
