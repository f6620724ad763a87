use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// How far back the reconciliation sweep looks for open PIX payments.
    pub reconciliation_window_hours: i64,
    /// How long execution history and audit rows are kept before cleanup.
    pub retention_days: i64,
    /// Chance the simulated bank confirms a fresh payment on one check.
    pub pix_confirm_probability: f64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            reconciliation_window_hours: env::var("RECONCILIATION_WINDOW_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .context("RECONCILIATION_WINDOW_HOURS must be a valid number")?,
            retention_days: env::var("RETENTION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("RETENTION_DAYS must be a valid number")?,
            pix_confirm_probability: env::var("PIX_CONFIRM_PROBABILITY")
                .unwrap_or_else(|_| "0.3".to_string())
                .parse()
                .context("PIX_CONFIRM_PROBABILITY must be a valid number")?,
        })
    }
}
