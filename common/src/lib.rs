//! Shared building blocks for the wraith workspace: scan configuration,
//! the error taxonomy, and target/port specification parsing.

pub mod config;
pub mod error;
pub mod network;
