use std::fs;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

const APP_DIR: &str = "gmail-automate";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> AppResult<Self> {
        let config_root = dirs::config_dir()
            .ok_or_else(|| AppError::Config("unable to resolve config directory".to_string()))?;
        let data_root = dirs::data_dir()
            .ok_or_else(|| AppError::Config("unable to resolve data directory".to_string()))?;

        let paths = Self::rooted(config_root.join(APP_DIR), data_root.join(APP_DIR));
        fs::create_dir_all(paths.profiles_dir())?;
        fs::create_dir_all(paths.tokens_dir())?;
        Ok(paths)
    }

    /// Uses explicit roots without touching the filesystem.
    pub fn rooted(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
        }
    }

    pub fn settings_file(&self, profile: &str) -> PathBuf {
        self.profiles_dir().join(format!("{profile}.json"))
    }

    pub fn default_credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.json")
    }

    pub fn default_token_file(&self, profile: &str) -> PathBuf {
        self.tokens_dir().join(format!("{profile}.json"))
    }

    pub fn default_database_file(&self) -> PathBuf {
        self.data_dir.join("emails.db")
    }

    fn profiles_dir(&self) -> PathBuf {
        self.config_dir.join("profiles")
    }

    fn tokens_dir(&self) -> PathBuf {
        self.data_dir.join("tokens")
    }
}
