//! Skillpass — HTTP surface for the training player.
//!
//! Exposes the module catalog, the live training session lifecycle and
//! event-sourced run history over JSON.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
