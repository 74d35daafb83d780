use crate::model::Owner;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
static CONFIG_FILE: &str = "config.yml";

/// Optional settings read from `config.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub owner: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub local: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub owner: Option<Owner>,
    pub data_dir: PathBuf,
    pub local: bool,
}

impl AppConfig {
    /// Flags and environment win over the config file, which wins over
    /// built-in defaults.
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let config_path = match overrides.config_path.clone() {
            Some(path) => Some(path),
            None => project_dirs().map(|d| d.config_dir().join(CONFIG_FILE)),
        };
        let file = match config_path {
            Some(path) => load_file_config(&path)?,
            None => FileConfig::default(),
        };
        Self::merge(overrides, file)
    }

    fn merge(overrides: Overrides, file: FileConfig) -> Result<Self> {
        let api_url = overrides
            .api_url
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let owner = overrides.owner.or(file.owner).and_then(Owner::new);
        let data_dir = match overrides.data_dir.or(file.data_dir) {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        Ok(AppConfig {
            api_url,
            owner,
            data_dir,
            local: overrides.local,
        })
    }
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    serde_yaml::from_str(&data).with_context(|| format!("parsing {:?}", path))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "stickyboard")
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = project_dirs().context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
