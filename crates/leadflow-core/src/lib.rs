//! Core domain + application logic for the lead/automation bot.
//!
//! This crate is framework-agnostic. Telegram, Google and Apollo live behind
//! ports (traits) implemented in adapter crates.

pub mod chat;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod leads;
pub mod logging;
pub mod messaging;
pub mod orchestrator;
pub mod ports;
pub mod scheduler;
pub mod session;

pub use errors::{Error, Result};
