use crate::error::{AppError, AppResult};

const DEFAULT_PROFILE: &str = "default";

/// Profile names end up in file names, so only a conservative character set
/// is accepted.
pub fn resolve_profile(requested: &str) -> AppResult<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_PROFILE.to_string());
    }

    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        || trimmed.starts_with('.')
    {
        return Err(AppError::InvalidInput(format!(
            "profile `{trimmed}` may only contain letters, digits, `-`, `_`, and `.`"
        )));
    }

    Ok(trimmed.to_string())
}
