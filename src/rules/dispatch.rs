use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::mail::{EmailRecord, MailService, Mailbox};

use super::model::Action;

/// Sends matched actions to the mail service, one provider command per
/// action. The mailbox listing is fetched on first use and reused for the
/// rest of the run.
pub struct ActionDispatcher<'a, M> {
    mail: &'a M,
    mailboxes: Option<Vec<Mailbox>>,
}

impl<'a, M: MailService> ActionDispatcher<'a, M> {
    pub fn new(mail: &'a M) -> Self {
        Self {
            mail,
            mailboxes: None,
        }
    }

    /// Runs actions in declared order, stopping at the first failure. Actions
    /// already sent stay applied.
    pub async fn perform_actions(
        &mut self,
        record: &EmailRecord,
        actions: &[Action],
    ) -> AppResult<usize> {
        for action in actions {
            self.perform_action(record, action).await?;
        }
        Ok(actions.len())
    }

    pub async fn perform_action(&mut self, record: &EmailRecord, action: &Action) -> AppResult<()> {
        let id = record.message_id.as_str();

        match action {
            Action::MarkAsRead => self.mail.mark_read(id).await?,
            Action::MarkAsUnread => self.mail.mark_unread(id).await?,
            Action::MoveToMailbox { mailbox } => {
                let mailbox_id = self.resolve_mailbox(mailbox).await?;
                self.mail.move_to(id, &mailbox_id).await?;
            }
        }

        info!(message_id = id, %action, "action applied");
        Ok(())
    }

    async fn resolve_mailbox(&mut self, name: &str) -> AppResult<String> {
        if self.mailboxes.is_none() {
            let listed = self.mail.list_mailboxes().await?;
            debug!(count = listed.len(), "mailboxes listed");
            self.mailboxes = Some(listed);
        }

        self.mailboxes
            .iter()
            .flatten()
            .find(|mailbox| mailbox.name == name)
            .map(|mailbox| mailbox.id.clone())
            .ok_or_else(|| AppError::MailboxNotFound(name.to_string()))
    }
}
