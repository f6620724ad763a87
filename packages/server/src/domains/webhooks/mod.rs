//! Webhooks domain - inbound event retention and outbound redelivery.

pub mod models;
pub mod retry;
pub mod store;
pub mod testing;

pub use models::webhook_event::WebhookEvent;
pub use retry::{NoopRetryQueue, RetryQueue, RetryQueueSummary};
pub use store::{PostgresWebhookEventStore, WebhookEventStore};
