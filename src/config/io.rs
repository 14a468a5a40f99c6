use super::models::AppConfig;
use super::tables::{ConfigTables, SECTION_NAMES};
use crate::error::Result;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

/// Parse either the sectioned layout (`[viewport]`, `[reading]`, ...) or a
/// flat table of `AppConfig` keys.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let table: toml::Table = toml::from_str(contents)?;
    let sectioned = SECTION_NAMES.iter().any(|name| table.contains_key(*name));
    if sectioned {
        let tables: ConfigTables = toml::from_str(contents)?;
        Ok(tables.into())
    } else {
        Ok(toml::from_str::<AppConfig>(contents)?)
    }
}

/// Serialize in the sectioned layout.
pub fn serialize_config(config: &AppConfig) -> Result<String> {
    Ok(toml::to_string(&ConfigTables::from(config))?)
}
