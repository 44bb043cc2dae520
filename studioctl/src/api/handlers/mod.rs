pub mod calendar;
pub mod credits;
pub mod events;
pub mod reservations;
pub mod spaces;
