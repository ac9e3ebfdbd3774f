//! Configuration module for Castnet
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use castnet::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("castnet.toml")).unwrap();
//! println!("Crawling {} with {} seeds", config.site.root, config.seeds.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, RotationStrategy, SeedEntry, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
