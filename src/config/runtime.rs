use std::path::PathBuf;

use chrono_tz::Tz;

use crate::error::{AppError, AppResult};

use super::paths::AppPaths;
use super::settings::Settings;

pub const ENV_CREDENTIALS_FILE: &str = "CREDENTIALS_FILE_PATH";
pub const ENV_TOKEN_FILE: &str = "TOKEN_FILE_PATH";
pub const ENV_DB_PATH: &str = "EMAILS_DB_PATH";
pub const ENV_TABLE_NAME: &str = "EMAIL_TABLE_NAME";
pub const ENV_TIME_ZONE: &str = "TIME_ZONE";

const DEFAULT_TABLE_NAME: &str = "emails";
const DEFAULT_TIME_ZONE: Tz = chrono_tz::Asia::Kolkata;
const DEFAULT_FETCH_LIMIT: u32 = 100;

/// Values given on the command line. They win over everything else.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub credentials_file: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub table_name: Option<String>,
    pub time_zone: Option<String>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub time_zone: Tz,
    pub fetch_limit: u32,
    pub fetch_query: Option<String>,
}

impl RuntimeConfig {
    /// Layers flag > environment > settings file > default, reading the
    /// environment through `env`.
    pub fn resolve<F>(
        paths: &AppPaths,
        profile: &str,
        settings: Settings,
        overrides: ConfigOverrides,
        env: F,
    ) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let credentials_file = overrides
            .credentials_file
            .or_else(|| env(ENV_CREDENTIALS_FILE).map(PathBuf::from))
            .or(settings.credentials_file)
            .unwrap_or_else(|| paths.default_credentials_file());
        let token_file = overrides
            .token_file
            .or_else(|| env(ENV_TOKEN_FILE).map(PathBuf::from))
            .or(settings.token_file)
            .unwrap_or_else(|| paths.default_token_file(profile));
        let db_path = overrides
            .db_path
            .or_else(|| env(ENV_DB_PATH).map(PathBuf::from))
            .or(settings.db_path)
            .unwrap_or_else(|| paths.default_database_file());

        let table_name = overrides
            .table_name
            .or_else(|| env(ENV_TABLE_NAME))
            .or(settings.table_name)
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
        let table_name = table_name.trim().to_string();
        if table_name.is_empty() {
            return Err(AppError::Config("table name must not be empty".to_string()));
        }

        let time_zone = match overrides
            .time_zone
            .or_else(|| env(ENV_TIME_ZONE))
            .or(settings.time_zone)
        {
            Some(name) => parse_time_zone(&name)?,
            None => DEFAULT_TIME_ZONE,
        };

        let fetch_limit = settings.fetch_limit.unwrap_or(DEFAULT_FETCH_LIMIT);
        if fetch_limit == 0 {
            return Err(AppError::Config(
                "fetch_limit must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            credentials_file,
            token_file,
            db_path,
            table_name,
            time_zone,
            fetch_limit,
            fetch_query: settings
                .fetch_query
                .filter(|query| !query.trim().is_empty()),
        })
    }
}

pub fn parse_time_zone(name: &str) -> AppResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| AppError::Config(format!("unknown time zone `{}`", name.trim())))
}
