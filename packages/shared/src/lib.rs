//! Shared utilities for the Todoke order-location relay.
//!
//! This crate holds the pieces both the server and the CLI client need:
//! logging setup and time handling.

pub mod logger;
pub mod time;
