//! Reading `config.toml` into a [`DashboardConfig`].

use std::io::ErrorKind;
use std::path::Path;

use drongo_common::ConfigError;
use tracing::{debug, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::DashboardConfig;
use crate::validation;

/// Parse the config at `path`. Missing sections and keys take their defaults.
///
/// Out-of-range values are only logged here; [`crate::load_config_from`]
/// is the strict variant.
pub fn load_from_path(path: &Path) -> Result<DashboardConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };

    let config: DashboardConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "Config has invalid values");
    }
    debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Load `drongo/config.toml` from the platform config directory, writing the
/// commented template there first if it does not exist yet.
pub fn load_default() -> Result<DashboardConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(&path)?;
            Ok(DashboardConfig::default())
        }
        loaded => loaded,
    }
}
