use serde::Serialize;

use crate::error::AppResult;

use super::RawEmail;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    pub id: String,
    pub name: String,
}

/// The provider boundary the rule engine talks to. Implementations own their
/// auth/session lifecycle and report failures as errors, never as empty
/// results.
#[allow(async_fn_in_trait)]
pub trait MailService {
    async fn fetch_recent(&self) -> AppResult<Vec<RawEmail>>;
    async fn mark_read(&self, message_id: &str) -> AppResult<()>;
    async fn mark_unread(&self, message_id: &str) -> AppResult<()>;
    async fn list_mailboxes(&self) -> AppResult<Vec<Mailbox>>;
    async fn move_to(&self, message_id: &str, mailbox_id: &str) -> AppResult<()>;
}
