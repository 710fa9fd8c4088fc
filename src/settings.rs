//! Code for loading program settings.
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// The default folder for model databases
const DEFAULT_OUTPUT_DIR: &str = "databases";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_output_dir() -> PathBuf {
    DEFAULT_OUTPUT_DIR.into()
}

fn default_overwrite() -> bool {
    true
}

/// Program settings from config file
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Folder in which model databases are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Whether existing databases may be replaced
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
    /// Number of threads for batch builds (zero uses every core)
    #[serde(default)]
    pub threads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output_dir: default_output_dir(),
            overwrite: default_overwrite(),
            threads: 0,
        }
    }
}

impl Settings {
    /// Read the settings file from the current working directory.
    ///
    /// If the file is not present, default values for settings will be used
    pub fn load() -> Result<Settings> {
        Self::load_from_path(Path::new(SETTINGS_FILE_NAME))
    }

    /// Read from the specified path, falling back to defaults if there is no file
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }
}
