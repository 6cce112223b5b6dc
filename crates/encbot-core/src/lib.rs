//! Core logic for the encrypt/decrypt reply bot.
//!
//! This crate does not know about Telegram. Everything chat-facing goes through
//! [`messaging::port::MessagingPort`], implemented in the adapter crate.

pub mod app;
pub mod broadcast;
pub mod cipher;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod progress;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod security;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
