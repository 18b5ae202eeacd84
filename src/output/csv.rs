use std::fs;
use std::io;
use std::path::Path;

use crate::error::AppResult;
use crate::mail::EmailRecord;

const HEADER: [&str; 6] = ["message_id", "subject", "snippet", "date", "from", "to"];

pub fn write_records<W: io::Write>(writer: W, records: &[EmailRecord]) -> AppResult<()> {
    let mut table = csv::Writer::from_writer(writer);
    table.write_record(HEADER)?;

    for record in records {
        let date = record.date.to_rfc3339();
        table.write_record([
            record.message_id.as_str(),
            record.subject.as_str(),
            record.snippet.as_str(),
            date.as_str(),
            record.from.as_str(),
            record.to.as_str(),
        ])?;
    }

    table.flush()?;
    Ok(())
}

pub fn write_file(path: &Path, records: &[EmailRecord]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_records(fs::File::create(path)?, records)
}
