// Brilha Limpeza - Background Engine
//
// This crate provides the background side of the booking platform: a
// self-scheduling job runner plus the PIX payment reconciliation that keeps
// payments and bookings consistent with the bank.
//
// Job handlers are organized per-domain in domains/*/

pub mod config;
pub mod domains;
pub mod kernel;
pub mod worker;

pub use config::*;
