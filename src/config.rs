use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model::Template;
use crate::totals::OverridePolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Where invoice data and rendered previews live. Falls back to the
    /// platform data directory.
    pub data_root: Option<String>,
    pub override_policy: OverridePolicy,
    pub default_template: Template,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "invoice-builder", "app")
}

pub fn config_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from("settings.toml"))
}

impl AppSettings {
    pub fn load() -> Result<AppSettings> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<AppSettings> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(AppSettings::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        match &self.data_root {
            Some(root) => PathBuf::from(expand_home_dir(root)),
            None => project_dirs()
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir().join("templates")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir().join("output")
    }
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
