use std::fs;
use std::path::Path;

use chrono_tz::Tz;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::mail::{EmailRecord, RawEmail, parse_provider_date};

use super::EmailStore;

const COLUMNS: &str = r#"message_id, subject, snippet, date, "to", "from""#;

/// SQLite-backed [`EmailStore`]. Dates are kept in the provider's text form
/// and resolved into `tz` on read.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    table: String,
    tz: Tz,
}

impl SqliteStore {
    pub fn open(path: &Path, table: &str, tz: Tz) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let store = Self::with_connection(Connection::open(path)?, table, tz)?;
        debug!(path = %path.display(), table, "email store opened");
        Ok(store)
    }

    pub fn open_in_memory(table: &str, tz: Tz) -> AppResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, table, tz)
    }

    fn with_connection(conn: Connection, table: &str, tz: Tz) -> AppResult<Self> {
        if !is_identifier(table) {
            return Err(AppError::Config(format!(
                "table name `{table}` must contain only letters, digits, and underscores"
            )));
        }

        conn.execute_batch(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                message_id TEXT PRIMARY KEY,
                subject TEXT NOT NULL DEFAULT '',
                snippet TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                "to" TEXT NOT NULL DEFAULT '',
                "from" TEXT NOT NULL DEFAULT ''
            );"#
        ))?;

        Ok(Self {
            conn,
            table: table.to_string(),
            tz,
        })
    }

    fn decode(&self, raw: RawEmail) -> Option<EmailRecord> {
        let message_id = raw.message_id.clone();
        let date = raw.date.clone();
        let record = EmailRecord::from_raw(raw, self.tz);
        if record.is_none() {
            warn!(%message_id, %date, "stored message has an unparseable date; skipping");
        }
        record
    }
}

impl EmailStore for SqliteStore {
    fn upsert(&self, emails: &[RawEmail]) -> AppResult<usize> {
        let sql = format!(
            r#"INSERT INTO "{table}" ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(message_id) DO UPDATE SET
                subject = excluded.subject,
                snippet = excluded.snippet,
                date = excluded.date,
                "to" = excluded."to",
                "from" = excluded."from""#,
            table = self.table,
        );

        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for email in emails {
                if email.message_id.trim().is_empty() {
                    warn!("fetched message without an id; skipping");
                    continue;
                }

                if parse_provider_date(&email.date).is_none() {
                    warn!(
                        message_id = %email.message_id,
                        date = %email.date,
                        "fetched message has an unparseable date; skipping"
                    );
                    continue;
                }

                stmt.execute(params![
                    email.message_id,
                    email.subject,
                    email.snippet,
                    email.date,
                    email.to,
                    email.from,
                ])?;
                written += 1;
            }
        }
        tx.commit()?;

        Ok(written)
    }

    fn fetch_all(&self) -> AppResult<Vec<EmailRecord>> {
        let sql = format!(r#"SELECT {COLUMNS} FROM "{}" ORDER BY rowid"#, self.table);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], raw_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().filter_map(|raw| self.decode(raw)).collect())
    }

    fn fetch_by_id(&self, message_id: &str) -> AppResult<EmailRecord> {
        let sql = format!(
            r#"SELECT {COLUMNS} FROM "{}" WHERE message_id = ?1"#,
            self.table
        );
        let raw = self
            .conn
            .query_row(&sql, [message_id], raw_from_row)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("message `{message_id}`")))?;

        self.decode(raw).ok_or_else(|| {
            AppError::NotFound(format!("message `{message_id}` has an unreadable date"))
        })
    }
}

fn raw_from_row(row: &Row<'_>) -> rusqlite::Result<RawEmail> {
    Ok(RawEmail {
        message_id: row.get(0)?,
        subject: row.get(1)?,
        snippet: row.get(2)?,
        date: row.get(3)?,
        to: row.get(4)?,
        from: row.get(5)?,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
