//! Core library entry point that wires together the Hearth subsystems.
//!
//! Each module is intentionally kept lightweight so that the boundaries
//! between responsibilities remain obvious when exploring the codebase:
//! - [`agents`] holds the provider catalogue, backend adapters, and registry.
//! - [`api`] exposes the command surface that the UI shell invokes.
//! - [`db`] initialises the SQLite database and applies migrations.
//! - [`errors`] keeps the central error catalogue with human friendly metadata.
//! - [`logging`] writes structured diagnostics to the event log table.
//! - [`model_manager`] routes completions through the active provider.
//! - [`secrets`] encrypts small configuration values under the master key.
//! - [`settings`] persists key/value settings, including the one secret.

pub mod agents;
pub mod api;
pub mod db;
pub mod errors;
pub mod logging;
pub mod model_manager;
pub mod secrets;
pub mod settings;
