use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(
    name = "gmail-automate",
    version,
    about = "Rule-based Gmail automation"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "default",
        help = "Profile name to use"
    )]
    pub profile: String,
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Verbose logging")]
    pub verbose: u8,
    #[command(flatten)]
    pub config: ConfigArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Default, Args)]
pub struct ConfigArgs {
    #[arg(long, global = true, help = "OAuth client secrets file")]
    pub credentials_file: Option<PathBuf>,
    #[arg(long, global = true, help = "Where the OAuth token is stored")]
    pub token_file: Option<PathBuf>,
    #[arg(long, global = true, help = "SQLite database file")]
    pub db_path: Option<PathBuf>,
    #[arg(long, global = true, help = "Table holding fetched emails")]
    pub table_name: Option<String>,
    #[arg(long, global = true, help = "IANA time zone used for date rules")]
    pub time_zone: Option<String>,
}

impl From<ConfigArgs> for ConfigOverrides {
    fn from(args: ConfigArgs) -> Self {
        Self {
            credentials_file: args.credentials_file,
            token_file: args.token_file,
            db_path: args.db_path,
            table_name: args.table_name,
            time_zone: args.time_zone,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the Gmail authorization
    Auth(AuthArgs),
    /// Show stored emails
    List(ListArgs),
    /// Apply a rule file to stored emails
    Automate(AutomateArgs),
    /// Check a rule file without touching the mailbox
    Validate(ValidateArgs),
    /// List mailbox names usable in move rules
    Mailboxes,
}

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    Login,
    Status,
    Logout,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, help = "Fetch recent mail from Gmail before listing")]
    pub force_retrieve: bool,
    #[arg(long, value_name = "PATH", help = "Write stored emails to a CSV file")]
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AutomateArgs {
    #[arg(help = "JSON rule file")]
    pub schema: PathBuf,
    #[arg(long, help = "Fetch recent mail from Gmail before applying rules")]
    pub force_retrieve: bool,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(help = "JSON rule file")]
    pub schema: PathBuf,
}
