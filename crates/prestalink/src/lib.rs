//! Core matching engine for the prestalink services marketplace.
//!
//! Clients publish service requests, providers bid on them, and the
//! marketplace enforces the match state machine: one accepted bid per request,
//! cascading rejection of rival bids, contact details and messaging unlocked
//! only after a match, reviews unlocked only after completion.

pub mod config;
pub mod error;
pub mod identity;
pub mod marketplace;
pub mod telemetry;
