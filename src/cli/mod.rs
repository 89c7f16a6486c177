//! CLI command handlers

pub mod commands;

pub use commands::{generate, init, inspect, validate};
