//! # Common Components
//!
//! Shared utilities used by both front ends.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration loading and the application settings

pub mod config;
