//! logfwd CLI library
//!
//! Exposes the argument parser, command handlers, and output helpers
//! so integration tests can drive them without spawning the binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
