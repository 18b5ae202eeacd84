use reqwest::{Client, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{AppError, AppResult};
use crate::mail::{Mailbox, RawEmail};

use super::labels;
use super::messages;

const GMAIL_API_BASE_URL: &str = "https://gmail.googleapis.com";

#[derive(Debug, Clone)]
pub struct GmailClient {
    http: Client,
    base_url: String,
}

impl GmailClient {
    pub fn new() -> Self {
        Self::with_base_url(GMAIL_API_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Lists up to `limit` message ids, newest first, then pulls the metadata
    /// headers of each one.
    pub async fn fetch_recent(
        &self,
        access_token: &str,
        limit: u32,
        query: Option<&str>,
    ) -> AppResult<Vec<RawEmail>> {
        let ids = self.list_message_ids(access_token, limit, query).await?;
        debug!(count = ids.len(), "message ids listed");

        let mut emails = Vec::with_capacity(ids.len());
        for id in ids {
            emails.push(self.get_metadata(&id, access_token).await?);
        }
        Ok(emails)
    }

    pub async fn get_metadata(&self, id: &str, access_token: &str) -> AppResult<RawEmail> {
        let endpoint = messages::message_endpoint(id);
        let query = messages::metadata_query();
        let resource: GmailMessageResource =
            self.get_json(&endpoint, access_token, Some(&query)).await?;
        Ok(resource.into_raw())
    }

    pub async fn list_mailboxes(&self, access_token: &str) -> AppResult<Vec<Mailbox>> {
        let response: GmailLabelListResponse = self
            .get_json(labels::list_labels_endpoint(), access_token, None)
            .await?;

        let mut mailboxes = response
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|label| Mailbox {
                id: label.id,
                name: label.name,
            })
            .collect::<Vec<_>>();
        mailboxes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(mailboxes)
    }

    pub async fn modify_labels(
        &self,
        id: &str,
        add: &[&str],
        remove: &[&str],
        access_token: &str,
    ) -> AppResult<()> {
        let body = GmailModifyLabelsRequest {
            add_label_ids: add.iter().map(|label| label.to_string()).collect(),
            remove_label_ids: remove.iter().map(|label| label.to_string()).collect(),
        };

        let _: IgnoredAny = self
            .post_json(&messages::modify_endpoint(id), access_token, &body)
            .await?;
        Ok(())
    }

    async fn list_message_ids(
        &self,
        access_token: &str,
        limit: u32,
        query: Option<&str>,
    ) -> AppResult<Vec<String>> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        while ids.len() < limit {
            let remaining = u32::try_from(limit - ids.len()).unwrap_or(u32::MAX);
            let params = messages::list_query(remaining, query, page_token.as_deref());
            let page: GmailMessageListResource = self
                .get_json(messages::list_endpoint(), access_token, Some(&params))
                .await?;

            ids.extend(
                page.messages
                    .unwrap_or_default()
                    .into_iter()
                    .map(|entry| entry.id),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        ids.truncate(limit);
        Ok(ids)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query: Option<&[(String, String)]>,
    ) -> AppResult<T> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self.http.get(url).bearer_auth(access_token);
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await?;
        self.parse_json_response(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        access_token: &str,
        body: &B,
    ) -> AppResult<T> {
        let url = self.endpoint_url(endpoint)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await?;

        self.parse_json_response(response).await
    }

    fn endpoint_url(&self, endpoint: &str) -> AppResult<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.set_path(endpoint.trim_start_matches('/'));
        Ok(url)
    }

    async fn parse_json_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let error = map_api_error(status, &body);
        warn!(%status, "gmail api request failed");
        Err(error)
    }
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct GmailMessageResource {
    id: String,
    snippet: Option<String>,
    payload: Option<GmailMessagePayload>,
}

impl GmailMessageResource {
    fn into_raw(self) -> RawEmail {
        let headers = self
            .payload
            .and_then(|payload| payload.headers)
            .unwrap_or_default();
        let header = |name: &str| header_value(&headers, name).unwrap_or_default();

        RawEmail {
            subject: header("Subject"),
            date: header("Date"),
            from: header("From"),
            to: header("To"),
            snippet: self.snippet.unwrap_or_default(),
            message_id: self.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GmailMessagePayload {
    headers: Option<Vec<GmailMessageHeader>>,
}

#[derive(Debug, Deserialize)]
struct GmailMessageHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessageListResource {
    messages: Option<Vec<GmailMessageListEntry>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GmailMessageListEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailLabelListResponse {
    labels: Option<Vec<GmailLabelResource>>,
}

#[derive(Debug, Deserialize)]
struct GmailLabelResource {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct GmailModifyLabelsRequest {
    #[serde(rename = "addLabelIds", skip_serializing_if = "Vec::is_empty")]
    add_label_ids: Vec<String>,
    #[serde(rename = "removeLabelIds", skip_serializing_if = "Vec::is_empty")]
    remove_label_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GmailApiErrorEnvelope {
    error: GmailApiError,
}

#[derive(Debug, Deserialize)]
struct GmailApiError {
    code: Option<u16>,
    status: Option<String>,
    message: Option<String>,
}

fn header_value(headers: &[GmailMessageHeader], target: &str) -> Option<String> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(target))
        .map(|header| header.value.trim().to_string())
}

fn map_api_error(status: StatusCode, body: &str) -> AppError {
    let detail = parse_api_error_message(body).unwrap_or_else(|| match body.trim() {
        "" => "empty response body".to_string(),
        body => body.to_string(),
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth(format!(
            "gmail rejected the credentials ({status}): {detail}. run `gmail-automate auth login`"
        )),
        _ => AppError::Api(format!("gmail request failed ({status}): {detail}")),
    }
}

fn parse_api_error_message(body: &str) -> Option<String> {
    let GmailApiErrorEnvelope { error } = serde_json::from_str(body).ok()?;

    let parts = [
        error.message,
        error.status.map(|status| format!("status={status}")),
        error.code.map(|code| format!("code={code}")),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();

    (!parts.is_empty()).then(|| parts.join(", "))
}
