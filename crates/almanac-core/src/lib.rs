//! Shared configuration, error types and defaults for the almanac crates.

pub mod config;
pub mod constants;
pub mod error;
