//! Configuration module for lnsync
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use lnsync::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lnsync.toml")).unwrap();
//! println!("Syncing from: {}", config.source.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CacheConfig, Config, SourceConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
