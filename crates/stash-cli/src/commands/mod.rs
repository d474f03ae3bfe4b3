//! CLI commands

pub mod config;
pub mod saved;
pub mod session;
