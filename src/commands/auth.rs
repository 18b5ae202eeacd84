use crate::auth::AuthService;
use crate::cli::AuthCommand;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(ctx: &AppContext, command: AuthCommand) -> AppResult<()> {
    match command {
        AuthCommand::Login => {
            let secrets = ctx.client_secrets()?;
            let result = AuthService::login(&ctx.profile, &secrets, &ctx.token_store).await?;

            let text = format!("{}: logged in, token stored", result.profile);
            ctx.output.emit(&text, &result)
        }
        AuthCommand::Status => {
            let status = AuthService::status(&ctx.profile, &ctx.token_store).await?;
            let text = if status.logged_in {
                let refresh_hint = match status.has_refresh_token {
                    Some(true) => " (refresh available)",
                    Some(false) => " (no refresh token)",
                    None => "",
                };
                format!("{}: logged in{refresh_hint}", status.profile)
            } else {
                format!("{}: logged out", status.profile)
            };

            ctx.output.emit(&text, &status)
        }
        AuthCommand::Logout => {
            let status = AuthService::logout(&ctx.profile, &ctx.token_store).await?;
            let text = format!("{}: {}", status.profile, status.note);
            ctx.output.emit(&text, &status)
        }
    }
}
