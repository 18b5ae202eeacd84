use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// OAuth client registration as downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Config(format!(
                "credentials file {} not found. download an OAuth client for a desktop app from the Google Cloud console and pass it with --credentials-file",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|err| match err {
            AppError::Json(err) => {
                AppError::Config(format!("invalid credentials file {}: {err}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(raw)?;
        let secrets = file.installed.or(file.web).ok_or_else(|| {
            AppError::Config("credentials file has neither an `installed` nor a `web` client".to_string())
        })?;

        if secrets.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "credentials file has an empty client_id".to_string(),
            ));
        }

        Ok(secrets)
    }
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_ENDPOINT.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_ENDPOINT.to_string()
}
