use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::ConfigError;
use crate::models::config::ConfigFile;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "TIMESHEET_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Config file location: `$TIMESHEET_CONFIG` when set and non-empty,
/// otherwise `./config.json`.
pub fn config_path() -> PathBuf {
    resolve_config_path(std::env::var_os(CONFIG_PATH_ENV))
}

fn resolve_config_path(overridden: Option<OsString>) -> PathBuf {
    overridden
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads the config file at `path`.
///
/// When the file does not exist a template with placeholder values is written
/// there and [`ConfigError::TemplateCreated`] is returned so the caller stops.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ConfigFile, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        warn!("No config file at {}, writing a template", path.display());
        write_template(path)?;
        return Err(ConfigError::TemplateCreated {
            path: path.to_path_buf(),
        });
    }

    info!("Loading config from {}", path.display());
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match serde_json::from_str::<ConfigFile>(&content) {
        Ok(config) => {
            info!(
                "Loaded config for project {} with {} exception range(s)",
                config.timesheet.project,
                config.timesheet.exceptional_hours.len()
            );
            Ok(config)
        }
        Err(e) => {
            error!("Failed to parse config: {}", e);
            Err(ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }
}

fn write_template(path: &Path) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    let template = serde_json::to_string_pretty(&ConfigFile::template()).map_err(|e| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, template).map_err(io_error)
}
