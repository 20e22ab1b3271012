use crate::{AppConfig, VerifyError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "backupcheck.toml";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

/// Load the configuration from the portable location next to the executable
/// if present, otherwise from the per-user config directory.
pub fn load_config() -> Result<LoadedConfig, VerifyError> {
    let (path, portable) = resolve_config_path()?;
    let mut loaded = read_config(path)?;
    loaded.portable = portable;
    Ok(loaded)
}

/// Load the configuration from an explicit file, which must exist.
pub fn load_config_from(path: &Path) -> Result<LoadedConfig, VerifyError> {
    if !path.is_file() {
        return Err(VerifyError::Config(format!(
            "Config file does not exist: {}",
            path.display()
        )));
    }
    read_config(path.to_path_buf())
}

fn read_config(path: PathBuf) -> Result<LoadedConfig, VerifyError> {
    let exists = path.exists();

    let config = if exists {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data)
            .map_err(|e| VerifyError::Config(format!("{}: {}", path.display(), e)))?
    } else {
        AppConfig::default()
    };

    Ok(LoadedConfig {
        config,
        path,
        exists,
        portable: false,
    })
}

fn resolve_config_path() -> Result<(PathBuf, bool), VerifyError> {
    if let Some(portable_path) = portable_config_path() {
        if portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    let dirs = ProjectDirs::from("", "backupcheck", "backupcheck")
        .ok_or_else(|| VerifyError::Config("Unable to determine config directory".to_string()))?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), false))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}
