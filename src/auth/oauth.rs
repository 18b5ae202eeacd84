use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::{debug, info};
use url::Url;

use crate::error::{AppError, AppResult};

use super::credentials::ClientSecrets;
use super::token::TokenSet;
use super::token_store::TokenStore;

const GOOGLE_REVOKE_ENDPOINT: &str = "https://oauth2.googleapis.com/revoke";
const GMAIL_MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Serialize)]
pub struct AuthLoginResult {
    pub profile: String,
    pub opened_browser: bool,
    pub authorization_url: String,
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub profile: String,
    pub logged_in: bool,
    pub expired: Option<bool>,
    pub expires_in_seconds: Option<i64>,
    pub has_refresh_token: Option<bool>,
    pub note: String,
}

impl AuthStatus {
    fn logged_out(profile: &str, note: impl Into<String>) -> Self {
        Self {
            profile: profile.to_string(),
            logged_in: false,
            expired: None,
            expires_in_seconds: None,
            has_refresh_token: None,
            note: note.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct AuthService;

impl AuthService {
    /// Installed-app login: PKCE, a loopback listener on an ephemeral port,
    /// then a code exchange against the client's token endpoint.
    pub async fn login<S: TokenStore>(
        profile: &str,
        secrets: &ClientSecrets,
        store: &S,
    ) -> AppResult<AuthLoginResult> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.map_err(|err| {
            AppError::Auth(format!("cannot listen for the login redirect: {err}"))
        })?;
        let redirect_uri = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());

        let request = AuthorizationRequest::new(secrets, &redirect_uri)?;
        let opened_browser = open_browser(&request.url);
        if !opened_browser {
            eprintln!("open this URL to authorize gmail-automate:\n{}", request.url);
        }
        debug!(%redirect_uri, opened_browser, "waiting for login redirect");

        let code = time::timeout(CALLBACK_TIMEOUT, accept_redirect(&listener, &request.state))
            .await
            .map_err(|_| AppError::Auth("timed out waiting for the login redirect".to_string()))??;

        let grant = TokenGrant::AuthorizationCode {
            code: &code,
            verifier: &request.verifier,
            redirect_uri: &redirect_uri,
        };
        store.save(&request_token(secrets, grant).await?)?;
        info!(profile, "login completed");

        Ok(AuthLoginResult {
            profile: profile.to_string(),
            opened_browser,
            authorization_url: request.url,
        })
    }

    /// Returns a usable access token, refreshing and persisting it when the
    /// stored one has expired.
    pub async fn access_token<S: TokenStore>(secrets: &ClientSecrets, store: &S) -> AppResult<String> {
        let current = store.load()?.ok_or_else(|| {
            AppError::Auth("not logged in. run `gmail-automate auth login`".to_string())
        })?;
        if !current.is_expired(SystemTime::now()) {
            return Ok(current.access_token);
        }

        let Some(refresh_token) = current.refresh_token else {
            return Err(AppError::Auth(
                "access token expired and cannot be refreshed. run `gmail-automate auth login`"
                    .to_string(),
            ));
        };

        debug!("refreshing expired access token");
        let mut refreshed = request_token(secrets, TokenGrant::Refresh(&refresh_token)).await?;
        // Google omits the refresh token on refresh responses.
        refreshed.refresh_token = refreshed.refresh_token.or(Some(refresh_token));
        store.save(&refreshed)?;
        Ok(refreshed.access_token)
    }

    pub async fn status<S: TokenStore>(profile: &str, store: &S) -> AppResult<AuthStatus> {
        let Some(token) = store.load()? else {
            return Ok(AuthStatus::logged_out(profile, "no token stored"));
        };

        let now = SystemTime::now();
        Ok(AuthStatus {
            profile: profile.to_string(),
            logged_in: true,
            expired: Some(token.is_expired(now)),
            expires_in_seconds: token.expires_in_seconds(now),
            has_refresh_token: Some(token.has_refresh_token()),
            note: "token loaded from local store".to_string(),
        })
    }

    /// Revokes the stored grant (best effort) and removes the local token.
    pub async fn logout<S: TokenStore>(profile: &str, store: &S) -> AppResult<AuthStatus> {
        let note = match store.load()? {
            Some(token) => {
                let grant = token.refresh_token.unwrap_or(token.access_token);
                match revoke(&grant).await {
                    Ok(()) => "grant revoked and local token removed".to_string(),
                    Err(err) => format!("local token removed; revoke failed: {err}"),
                }
            }
            None => "no token stored".to_string(),
        };

        store.clear()?;
        Ok(AuthStatus::logged_out(profile, note))
    }
}

struct AuthorizationRequest {
    url: String,
    verifier: String,
    state: String,
}

impl AuthorizationRequest {
    fn new(secrets: &ClientSecrets, redirect_uri: &str) -> AppResult<Self> {
        let state = random_token(32);
        let verifier = random_token(96);

        let mut url = Url::parse(&secrets.auth_uri)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &secrets.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", GMAIL_MODIFY_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", &state)
            .append_pair("code_challenge", &pkce_challenge(&verifier))
            .append_pair("code_challenge_method", "S256");

        Ok(Self {
            url: url.into(),
            verifier,
            state,
        })
    }
}

enum TokenGrant<'a> {
    AuthorizationCode {
        code: &'a str,
        verifier: &'a str,
        redirect_uri: &'a str,
    },
    Refresh(&'a str),
}

impl TokenGrant<'_> {
    fn form(&self, secrets: &ClientSecrets) -> Vec<(&'static str, String)> {
        let mut form = match self {
            Self::AuthorizationCode {
                code,
                verifier,
                redirect_uri,
            } => vec![
                ("grant_type", "authorization_code".to_string()),
                ("code", code.to_string()),
                ("code_verifier", verifier.to_string()),
                ("redirect_uri", redirect_uri.to_string()),
            ],
            Self::Refresh(refresh_token) => vec![
                ("grant_type", "refresh_token".to_string()),
                ("refresh_token", refresh_token.to_string()),
            ],
        };
        form.push(("client_id", secrets.client_id.clone()));
        if let Some(secret) = &secrets.client_secret {
            form.push(("client_secret", secret.clone()));
        }
        form
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

async fn request_token(secrets: &ClientSecrets, grant: TokenGrant<'_>) -> AppResult<TokenSet> {
    let response = reqwest::Client::new()
        .post(&secrets.token_uri)
        .form(&grant.form(secrets))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await?;
        let detail = match serde_json::from_str::<TokenErrorResponse>(&body).unwrap_or_default() {
            TokenErrorResponse {
                error: Some(error),
                error_description,
            } => match error_description {
                Some(description) => format!("{error} ({description})"),
                None => error,
            },
            TokenErrorResponse { error: None, .. } => body,
        };
        return Err(AppError::Auth(format!(
            "token endpoint returned {status}: {detail}"
        )));
    }

    let payload: TokenResponse = response.json().await?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok();
    Ok(TokenSet {
        access_token: payload.access_token,
        refresh_token: payload.refresh_token,
        expires_at_unix: payload
            .expires_in
            .zip(now)
            .map(|(expires_in, now)| now.as_secs().saturating_add(expires_in)),
        token_type: payload.token_type,
        scope: payload.scope,
    })
}

async fn revoke(token: &str) -> AppResult<()> {
    let response = reqwest::Client::new()
        .post(GOOGLE_REVOKE_ENDPOINT)
        .form(&[("token", token)])
        .send()
        .await?;

    match response.status() {
        status if status.is_success() => Ok(()),
        status => Err(AppError::Auth(format!("revoke endpoint returned {status}"))),
    }
}

/// Serves exactly one redirect and hands back its authorization code.
async fn accept_redirect(listener: &TcpListener, expected_state: &str) -> AppResult<String> {
    let (mut stream, _) = listener.accept().await?;

    let mut buf = vec![0_u8; 8192];
    let size = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..size]);

    let outcome = redirect_target(&request).and_then(|target| authorization_code(target, expected_state));
    let (status, message) = match &outcome {
        Ok(_) => ("200 OK", "gmail-automate is authorized. you can close this tab.".to_string()),
        Err(err) => ("400 Bad Request", err.to_string()),
    };
    respond(&mut stream, status, &message).await?;
    outcome
}

/// Request target of a `GET` request line.
fn redirect_target(request: &str) -> AppResult<&str> {
    let mut request_line = request.lines().next().unwrap_or_default().split_whitespace();
    match (request_line.next(), request_line.next()) {
        (Some("GET"), Some(target)) => Ok(target),
        _ => Err(AppError::Auth("unexpected request on the login redirect".to_string())),
    }
}

fn authorization_code(target: &str, expected_state: &str) -> AppResult<String> {
    let url = Url::parse("http://127.0.0.1")?.join(target)?;
    if url.path() != "/" {
        return Err(AppError::Auth(format!(
            "unexpected login redirect path {}",
            url.path()
        )));
    }

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        return Err(AppError::Auth(format!("authorization denied: {error}")));
    }
    if param("state").as_deref() != Some(expected_state) {
        return Err(AppError::Auth("login redirect state does not match".to_string()));
    }
    param("code").ok_or_else(|| AppError::Auth("login redirect carries no code".to_string()))
}

async fn respond(stream: &mut TcpStream, status: &str, message: &str) -> AppResult<()> {
    let body = format!(
        "<!doctype html><p>{}</p>",
        html_escape::encode_text(message)
    );
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0_u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn open_browser(url: &str) -> bool {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };

    command
        .arg(url)
        .status()
        .is_ok_and(|status| status.success())
}
