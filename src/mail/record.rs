use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Message metadata as the provider hands it over, date still in header form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEmail {
    pub message_id: String,
    pub subject: String,
    pub snippet: String,
    pub date: String,
    pub from: String,
    pub to: String,
}

/// A stored message with its date resolved into the reference timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailRecord {
    pub message_id: String,
    pub subject: String,
    pub snippet: String,
    pub date: DateTime<Tz>,
    pub from: String,
    pub to: String,
}

impl EmailRecord {
    /// Returns `None` when the provider date cannot be parsed.
    pub fn from_raw(raw: RawEmail, tz: Tz) -> Option<Self> {
        let date = parse_provider_date(&raw.date)?.with_timezone(&tz);

        Some(Self {
            message_id: raw.message_id,
            subject: raw.subject,
            snippet: raw.snippet,
            date,
            from: raw.from,
            to: raw.to,
        })
    }
}

/// Parses an RFC 2822 `Date` header. Gmail sometimes appends a zone comment
/// such as `(UTC)`, which is dropped before parsing.
pub fn parse_provider_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let mut trimmed = value.trim();
    if trimmed.ends_with(')') {
        if let Some(start) = trimmed.rfind('(') {
            trimmed = trimmed[..start].trim_end();
        }
    }

    if trimmed.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(trimmed).ok()
}
