//! Configuration file discovery and loading.

use crate::config::schema::InstallerConfig;
use crate::error::{ResolverError, Result};
use crate::shell::platform::home_dir;
use std::fs;
use std::path::{Path, PathBuf};

/// The user's config file: `~/.reconkit/config.yml`.
pub fn default_config_path() -> PathBuf {
    home_dir().join(".reconkit").join("config.yml")
}

/// Load configuration.
///
/// An explicit path must exist. Without one, the default location is used
/// when present and built-in defaults otherwise.
///
/// # Errors
///
/// Returns `ConfigNotFound` if an explicit file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
/// Returns `ConfigValidationError` for out-of-range values.
pub fn load_config(explicit: Option<&Path>) -> Result<InstallerConfig> {
    let mut config = match explicit {
        Some(path) => load_config_file(path)?,
        None => {
            let path = default_config_path();
            if path.exists() {
                load_config_file(&path)?
            } else {
                InstallerConfig::default()
            }
        }
    };
    config.expand_paths();
    validate(&config)?;
    Ok(config)
}

/// Load a single config file.
pub fn load_config_file(path: &Path) -> Result<InstallerConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ResolverError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ResolverError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into an [`InstallerConfig`].
///
/// An empty document yields the defaults.
pub fn parse_config(content: &str, source_path: &Path) -> Result<InstallerConfig> {
    if content.trim().is_empty() {
        return Ok(InstallerConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ResolverError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Check value ranges serde can't express.
pub fn validate(config: &InstallerConfig) -> Result<()> {
    let mut problems = Vec::new();

    for (name, value) in [
        ("thresholds.run", config.thresholds.run),
        ("thresholds.category", config.thresholds.category),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            problems.push(format!("{name} must be in (0, 1], got {value}"));
        }
    }

    let t = &config.timeouts;
    for (name, value) in [
        ("timeouts.verify_secs", t.verify_secs),
        ("timeouts.install_secs", t.install_secs),
        ("timeouts.refresh_secs", t.refresh_secs),
        ("timeouts.network_probe_secs", t.network_probe_secs),
    ] {
        if value == 0 {
            problems.push(format!("{name} must be greater than 0"));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ResolverError::ConfigValidationError {
            message: problems.join("; "),
        })
    }
}
