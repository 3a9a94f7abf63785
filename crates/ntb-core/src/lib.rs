//! Core of the number lookup bot.
//!
//! This crate is framework-agnostic. The chat platform lives behind
//! `messaging::port` traits implemented in adapter crates; storage, rate-limit
//! bookkeeping and broadcast fan-out live behind `ports`.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod handlers;
pub mod lifecycle;
pub mod logging;
pub mod lookup;
pub mod messaging;
pub mod ports;
pub mod router;
pub mod security;
pub mod store;
pub mod validation;

pub use errors::{Error, Result};
