use crate::error::AppResult;
use crate::mail::{MailService, Mailbox, RawEmail};

use super::client::GmailClient;
use super::labels::UNREAD;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub limit: u32,
    pub query: Option<String>,
}

/// An authenticated Gmail connection for one run.
#[derive(Debug, Clone)]
pub struct GmailSession {
    client: GmailClient,
    access_token: String,
    fetch: FetchOptions,
}

impl GmailSession {
    pub fn new(client: GmailClient, access_token: String, fetch: FetchOptions) -> Self {
        Self {
            client,
            access_token,
            fetch,
        }
    }
}

impl MailService for GmailSession {
    async fn fetch_recent(&self) -> AppResult<Vec<RawEmail>> {
        self.client
            .fetch_recent(&self.access_token, self.fetch.limit, self.fetch.query.as_deref())
            .await
    }

    async fn mark_read(&self, message_id: &str) -> AppResult<()> {
        self.client
            .modify_labels(message_id, &[], &[UNREAD], &self.access_token)
            .await
    }

    async fn mark_unread(&self, message_id: &str) -> AppResult<()> {
        self.client
            .modify_labels(message_id, &[UNREAD], &[], &self.access_token)
            .await
    }

    async fn list_mailboxes(&self) -> AppResult<Vec<Mailbox>> {
        self.client.list_mailboxes(&self.access_token).await
    }

    async fn move_to(&self, message_id: &str, mailbox_id: &str) -> AppResult<()> {
        self.client
            .modify_labels(message_id, &[mailbox_id], &[], &self.access_token)
            .await
    }
}
