//! Shared configuration, error and domain types for HireFlow crates.

pub mod config;
pub mod error;
pub mod types;
