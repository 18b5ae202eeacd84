pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::AppResult;
use crate::mail::{EmailRecord, RawEmail};

/// Local cache of provider messages keyed by `message_id`.
pub trait EmailStore {
    /// Inserts or refreshes messages in one transaction and returns how many
    /// were written. Messages with unparseable dates are skipped.
    fn upsert(&self, emails: &[RawEmail]) -> AppResult<usize>;
    /// All readable records in insertion order.
    fn fetch_all(&self) -> AppResult<Vec<EmailRecord>>;
    fn fetch_by_id(&self, message_id: &str) -> AppResult<EmailRecord>;
}
