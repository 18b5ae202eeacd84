use crate::context::AppContext;
use crate::error::AppResult;
use crate::mail::MailService;
use crate::output::OutputMode;

pub async fn run(ctx: &AppContext) -> AppResult<()> {
    let session = ctx.mail_session().await?;
    let mailboxes = session.list_mailboxes().await?;

    if ctx.output.mode() == OutputMode::Text {
        if mailboxes.is_empty() {
            println!("0 mailboxes");
        }
        for mailbox in &mailboxes {
            println!("{}\t{}", mailbox.name, mailbox.id);
        }
        return Ok(());
    }

    ctx.output.emit("", &mailboxes)
}
