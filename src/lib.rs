//! # CJ token agent
//!
//! Keeps the CJ Dropshipping access token usable for every support-bot call:
//! the token store holds and persists the current credential, the refresher
//! mints a new one through the token exchange when the API rejects the old one,
//! and refresh failures are alerted over the configured channels.
//!
//! Modules:
//! - `config`: YAML service configuration, env expansion and validation
//! - `cache`: credential type, persisted token store
//! - `sources`: token exchange and single-flight refresher
//! - `alerts`: Telegram / email alert fan-out
//! - `gateway`: protected CJ calls with refresh-and-retry-once
//! - `server`: HTTP surface for the chatbot

pub mod alerts;
pub mod app;
pub mod cache;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod observability;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
pub mod tests;

pub use crate::cache::credential::Credential;
pub use crate::errors::{GatewayError, RefreshFailed};
