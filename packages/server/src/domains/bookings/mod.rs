//! Bookings domain - cleaning appointments that payments settle.

pub mod models;
pub mod store;
pub mod testing;

pub use models::booking::{Booking, BookingStatus};
pub use store::{BookingStore, PostgresBookingStore};
