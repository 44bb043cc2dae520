//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases for readability:
//!
//! - [`AccountId`]: owner of credit lots and reservations (issued by the auth proxy)
//! - [`AdminId`]: administrator identity, same id space as accounts
//! - [`SpaceId`], [`LotId`], [`ReservationId`], [`ScheduleId`], [`ClosedDateId`],
//!   [`ExternalClientId`]: storage entities

use uuid::Uuid;

pub type AccountId = Uuid;
pub type AdminId = Uuid;
pub type SpaceId = Uuid;
pub type LotId = Uuid;
pub type ReservationId = Uuid;
pub type ScheduleId = Uuid;
pub type ClosedDateId = Uuid;
pub type ExternalClientId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces.
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbrev_takes_first_eight_chars() {
        let id: Uuid = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }
}
