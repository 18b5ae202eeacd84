use crate::cli::ListArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::output::{self, OutputMode};
use crate::rules::sync_store;
use crate::store::EmailStore;

pub async fn run(ctx: &AppContext, args: ListArgs) -> AppResult<()> {
    let store = ctx.open_store()?;
    if args.force_retrieve {
        let session = ctx.mail_session().await?;
        sync_store(&session, &store).await?;
    }

    let records = store.fetch_all()?;

    if let Some(path) = args.csv.as_deref() {
        output::csv::write_file(path, &records)?;
        let text = format!("wrote {} emails to {}", records.len(), path.display());
        return ctx.output.emit(
            &text,
            &serde_json::json!({ "path": path, "emails": records.len() }),
        );
    }

    if ctx.output.mode() == OutputMode::Text {
        if records.is_empty() {
            println!("0 emails");
            return Ok(());
        }

        for (index, record) in records.iter().enumerate() {
            println!("{}. {}", index + 1, record.message_id);
            println!("   from: {}", or_placeholder(&record.from, "(unknown sender)"));
            println!("   to: {}", or_placeholder(&record.to, "(no recipients)"));
            println!("   subject: {}", or_placeholder(&record.subject, "(no subject)"));
            println!("   date: {}", record.date.format("%d-%m-%Y %H:%M:%S %Z"));
            println!();
            println!("   {}", format_preview(&record.snippet));

            if index + 1 < records.len() {
                println!();
            }
        }

        return Ok(());
    }

    let text = format!("{} emails", records.len());
    ctx.output.emit(&text, &records)
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn format_preview(snippet: &str) -> String {
    let decoded = html_escape::decode_html_entities(snippet).to_string();
    let compact = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.is_empty() {
        return "(no preview)".to_string();
    }

    if compact.len() <= 120 {
        return compact;
    }

    let mut end = 120;
    while !compact.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &compact[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_preview_with_truncation() {
        let preview = format_preview(
            "this is a very long preview string that should be truncated at one hundred and twenty characters to keep list output compact and readable",
        );
        assert!(preview.ends_with("..."));
        assert!(preview.len() <= 123);
    }

    #[test]
    fn decodes_common_html_entities_in_preview() {
        let preview = format_preview("I&#39;ve &amp; you&#x27;ve &lt;done&gt; this");
        assert_eq!(preview, "I've & you've <done> this");
    }

    #[test]
    fn blank_values_get_placeholders() {
        assert_eq!(format_preview("  \n "), "(no preview)");
        assert_eq!(or_placeholder(" ", "(no subject)"), "(no subject)");
        assert_eq!(or_placeholder("Hello", "(no subject)"), "Hello");
    }
}
