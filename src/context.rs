use crate::api::{FetchOptions, GmailClient, GmailSession};
use crate::auth::{AuthService, ClientSecrets, FileTokenStore};
use crate::config::{self, AppPaths, ConfigOverrides, RuntimeConfig};
use crate::error::AppResult;
use crate::output::Output;
use crate::store::SqliteStore;

#[derive(Debug)]
pub struct AppContext {
    pub profile: String,
    pub config: RuntimeConfig,
    pub token_store: FileTokenStore,
    pub gmail_client: GmailClient,
    pub output: Output,
}

impl AppContext {
    pub fn bootstrap(profile: String, json: bool, overrides: ConfigOverrides) -> AppResult<Self> {
        let profile = config::resolve_profile(&profile)?;
        let paths = AppPaths::discover()?;
        let settings = config::load_settings(&paths, &profile)?;
        let config = RuntimeConfig::resolve(&paths, &profile, settings, overrides, |key| {
            std::env::var(key).ok()
        })?;
        let token_store = FileTokenStore::new(config.token_file.clone());

        Ok(Self {
            profile,
            config,
            token_store,
            gmail_client: GmailClient::new(),
            output: Output::new(json),
        })
    }

    pub fn client_secrets(&self) -> AppResult<ClientSecrets> {
        ClientSecrets::load(&self.config.credentials_file)
    }

    pub async fn access_token(&self) -> AppResult<String> {
        let secrets = self.client_secrets()?;
        AuthService::access_token(&secrets, &self.token_store).await
    }

    pub async fn mail_session(&self) -> AppResult<GmailSession> {
        let access_token = self.access_token().await?;
        Ok(GmailSession::new(
            self.gmail_client.clone(),
            access_token,
            FetchOptions {
                limit: self.config.fetch_limit,
                query: self.config.fetch_query.clone(),
            },
        ))
    }

    pub fn open_store(&self) -> AppResult<SqliteStore> {
        SqliteStore::open(
            &self.config.db_path,
            &self.config.table_name,
            self.config.time_zone,
        )
    }
}
