//! Configuration module for Auto-Alert
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use auto_alert::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("auto-alert.toml")).unwrap();
//! println!("Fetching at most {} pages per cycle", config.engine.page_cap);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, EngineConfig, OutputConfig, ProxyConfig, SelectorConfig, TargetConfig, TierConfig,
    TierKind, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
