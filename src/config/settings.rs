use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Per-profile settings file. Every key is optional; anything unset falls back
/// to environment variables and then built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub fetch_limit: Option<u32>,
    #[serde(default)]
    pub fetch_query: Option<String>,
}

pub fn load(path: &Path) -> AppResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)?;
    let settings = serde_json::from_str(&raw)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(&dir.path().join("none.json")).unwrap(), Settings::default());
    }

    #[test]
    fn reads_partial_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work.json");
        fs::write(&path, r#"{"time_zone": "Europe/Berlin", "fetch_limit": 25}"#).unwrap();

        let settings = load(&path).unwrap();
        assert_eq!(settings.time_zone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(settings.fetch_limit, Some(25));
        assert_eq!(settings.db_path, None);
    }
}
