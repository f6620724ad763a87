//! Notifications domain - outbound customer messaging.

pub mod dispatcher;
pub mod testing;

pub use dispatcher::{DispatchSummary, NoopDispatcher, NotificationDispatcher};
