//! The attendance toggle state machine.
//!
//! Two states per (identity, local calendar date): checked in and checked
//! out. Absent-or-checked-out transitions to check-in; checked-in
//! transitions to check-out. Only events are persisted — state is derived
//! by replaying the latest event.

use crate::types::AttendanceStatus;
use chrono::NaiveDate;

/// Decide the next status from the most recent event, if any.
///
/// An event from a different calendar date never carries over: the day
/// always starts with a check-in, even if yesterday ended checked in.
pub fn next_status(
    last: Option<(NaiveDate, AttendanceStatus)>,
    today: NaiveDate,
) -> AttendanceStatus {
    match last {
        Some((date, status)) if date == today => status.toggled(),
        _ => AttendanceStatus::CheckIn,
    }
}
