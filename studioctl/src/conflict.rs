//! Conflict detection for candidate booking intervals.
//!
//! Intervals are half-open: `[s1, e1)` and `[s2, e2)` overlap iff
//! `s1 < e2 && s2 < e1`, so back-to-back bookings (one ending exactly when the
//! next starts) never conflict. Only pending and confirmed reservations hold
//! their slot; cancelled and completed ones are invisible here.

use chrono::{DateTime, Utc};

use crate::db::models::reservations::Reservation;
use crate::types::{ReservationId, SpaceId};

pub fn overlaps(s1: DateTime<Utc>, e1: DateTime<Utc>, s2: DateTime<Utc>, e2: DateTime<Utc>) -> bool {
    s1 < e2 && s2 < e1
}

/// True if any slot-holding reservation on `space_id` overlaps
/// `[start, end)`. `exclude` skips one reservation id so an existing booking
/// can be re-validated (e.g. at approval time) without matching itself.
pub fn has_conflict(
    reservations: &[Reservation],
    space_id: SpaceId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<ReservationId>,
) -> bool {
    reservations.iter().any(|r| {
        r.space_id == space_id
            && r.status.holds_slot()
            && exclude != Some(r.id)
            && overlaps(start, end, r.start_time, r.end_time)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::reservations::ReservationStatus;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap()
    }

    fn reservation(space_id: SpaceId, start: DateTime<Utc>, end: DateTime<Utc>, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            account_id: Some(Uuid::new_v4()),
            external_client_id: None,
            space_id,
            start_time: start,
            end_time: end,
            status,
            credits_used: 6,
            requires_approval: false,
            approved_by: None,
            approved_at: None,
            created_by: None,
            notes: None,
            created_at: start - Duration::days(1),
        }
    }

    #[test]
    fn half_open_intervals_allow_back_to_back() {
        assert!(!overlaps(at(10), at(11), at(11), at(12)));
        assert!(!overlaps(at(11), at(12), at(10), at(11)));
        assert!(overlaps(at(10), at(12), at(11), at(13)));
        assert!(overlaps(at(10), at(12), at(10), at(12)));
        assert!(overlaps(at(10), at(13), at(11), at(12)), "containment counts");
    }

    #[test]
    fn only_slot_holding_statuses_conflict() {
        let space = Uuid::new_v4();
        let existing = vec![
            reservation(space, at(10), at(11), ReservationStatus::Cancelled),
            reservation(space, at(10), at(11), ReservationStatus::Completed),
        ];
        assert!(!has_conflict(&existing, space, at(10), at(11), None));

        let pending = vec![reservation(space, at(10), at(11), ReservationStatus::Pending)];
        assert!(has_conflict(&pending, space, at(10), at(11), None));
    }

    #[test]
    fn other_spaces_do_not_conflict() {
        let space = Uuid::new_v4();
        let existing = vec![reservation(Uuid::new_v4(), at(10), at(11), ReservationStatus::Confirmed)];
        assert!(!has_conflict(&existing, space, at(10), at(11), None));
    }

    #[test]
    fn exclusion_skips_self_only() {
        let space = Uuid::new_v4();
        let mine = reservation(space, at(10), at(11), ReservationStatus::Pending);
        let other = reservation(space, at(10), at(11), ReservationStatus::Confirmed);

        assert!(!has_conflict(std::slice::from_ref(&mine), space, at(10), at(11), Some(mine.id)));
        assert!(has_conflict(&[mine.clone(), other], space, at(10), at(11), Some(mine.id)));
    }
}
