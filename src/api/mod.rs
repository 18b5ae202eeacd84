pub mod client;
pub mod labels;
pub mod messages;
pub mod session;

pub use client::GmailClient;
pub use session::{FetchOptions, GmailSession};
