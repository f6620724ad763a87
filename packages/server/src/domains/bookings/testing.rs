//! In-memory double for booking persistence.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use super::store::BookingStore;

/// Records which bookings were completed instead of touching a database.
#[derive(Default)]
pub struct TestBookingStore {
    completed: Mutex<Vec<Uuid>>,
    fail_updates: Mutex<bool>,
}

impl TestBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every update fail with a storage error.
    pub fn set_fail_updates(&self, fail: bool) {
        *self.fail_updates.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// Booking ids completed so far, in call order.
    pub fn completed(&self) -> Vec<Uuid> {
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl BookingStore for TestBookingStore {
    async fn mark_completed(&self, id: Uuid) -> Result<()> {
        if *self.fail_updates.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(anyhow!("booking store unavailable"));
        }
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(id);
        Ok(())
    }
}
