//! # Sizopi
//!
//! Facility reservation server for the Sizopi zoo: configuration and
//! bootstrap that wire the `PostgreSQL` store, the reservation manager and
//! the HTTP API together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod config;

pub use config::{Config, ConfigError};
