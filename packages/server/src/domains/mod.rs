// Business domains
pub mod bookings;
pub mod notifications;
pub mod payments;
pub mod webhooks;
