use crate::cli::{Cli, Command};
use crate::commands;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    let Cli {
        profile,
        json,
        verbose: _,
        config,
        command,
    } = cli;

    let ctx = AppContext::bootstrap(profile, json, config.into())?;

    match command {
        Command::Auth(args) => commands::auth::run(&ctx, args.command).await,
        Command::List(args) => commands::list::run(&ctx, args).await,
        Command::Automate(args) => commands::automate::run(&ctx, args).await,
        Command::Validate(args) => commands::validate::run(&ctx, args),
        Command::Mailboxes => commands::mailboxes::run(&ctx).await,
    }
}
