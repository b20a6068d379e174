//! Core domain + application logic for the UgPhone auto-buyer bot.
//!
//! This crate is framework-agnostic. Telegram and the UgPhone HTTP API live
//! behind ports (traits) implemented in adapter crates.

pub mod accounts;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod job;
pub mod logging;
pub mod messaging;
pub mod purchase;
pub mod security;
pub mod store;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
