pub mod auth;
pub mod automate;
pub mod list;
pub mod mailboxes;
pub mod validate;
