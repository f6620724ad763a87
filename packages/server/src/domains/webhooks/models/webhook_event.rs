//! Inbound webhook events as the ingestion endpoint persists them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct WebhookEvent {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub event_type: String,

    #[builder(default = serde_json::json!({}))]
    pub payload: serde_json::Value,

    #[builder(default = "pending".to_string())]
    pub status: String,

    #[builder(default = 0)]
    pub attempts: i32,

    #[builder(default = Utc::now())]
    pub received_at: DateTime<Utc>,
}
