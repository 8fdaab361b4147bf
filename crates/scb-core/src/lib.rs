//! Core domain + application logic for the insomnia screening bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! messaging port implemented in the adapter crate.

pub mod answer;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod diagnosis;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod quiz;
pub mod security;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};
