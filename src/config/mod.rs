//! Installer configuration.
//!
//! - Schema definitions in [`schema`]
//! - File discovery, loading and validation in [`loader`]
//!
//! # Example
//!
//! ```
//! use reconkit::config::{load_config, InstallerConfig};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("config.yml");
//! fs::write(&path, "thresholds:\n  run: 0.6\n").unwrap();
//!
//! let config = load_config(Some(&path)).unwrap();
//! assert_eq!(config.thresholds.run, 0.6);
//! assert_eq!(config.thresholds.category, InstallerConfig::default().thresholds.category);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{default_config_path, load_config, load_config_file, parse_config, validate};
pub use schema::{InstallerConfig, NetworkConfig, PathsConfig, Thresholds, Timeouts};
