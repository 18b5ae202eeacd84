pub mod record;
pub mod service;

pub use record::{EmailRecord, RawEmail, parse_provider_date};
pub use service::{Mailbox, MailService};
