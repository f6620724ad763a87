//! Booking model. Bookings are created and managed elsewhere; the background
//! engine only flips them to `completed` once their PIX payment settles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

/// A scheduled cleaning appointment.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Booking {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub customer_name: String,

    pub service: String,

    #[builder(default)]
    pub status: BookingStatus,

    #[builder(default = Utc::now())]
    pub scheduled_for: DateTime<Utc>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,

    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}
