//! Repository implementations for store access.
//!
//! Each repository wraps the mutable state of one [`crate::db::Store`]
//! transaction and provides strongly-typed operations for one family of
//! entities, returning domain models from [`crate::db::models`]. Repositories
//! are created inside a transaction closure and dropped with it; nothing here
//! commits or rolls back on its own.
//!
//! # Available Repositories
//!
//! - [`Lots`]: credit lots and the ledger audit history
//! - [`Spaces`] / [`Schedules`]: bookable spaces and their weekly windows
//! - [`Calendar`]: global business hours and closed dates
//! - [`Reservations`]: reservations, cancellations, penalties
//! - [`ExternalClients`]: walk-in clients booked by staff

pub mod calendar;
pub mod credits;
pub mod reservations;
pub mod spaces;

pub use calendar::Calendar;
pub use credits::Lots;
pub use reservations::{ExternalClients, Reservations};
pub use spaces::{Schedules, Spaces};
