//! Surety-core: Shared types, errors, and configuration
//!
//! This crate provides the foundational types used across the Surety workspace.

pub mod chains;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod types;
pub mod units;

pub use config::*;
pub use errors::*;
pub use gateway::*;
pub use types::*;
