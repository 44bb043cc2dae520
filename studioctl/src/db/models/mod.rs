pub mod calendar;
pub mod credits;
pub mod reservations;
pub mod spaces;
