/// Headers the automation keeps from each message.
pub const METADATA_HEADERS: [&str; 4] = ["Subject", "From", "To", "Date"];

/// Gmail refuses larger pages for `messages.list`.
pub const MAX_PAGE_SIZE: u32 = 500;

pub fn message_endpoint(id: &str) -> String {
    format!("/gmail/v1/users/me/messages/{id}")
}

pub fn list_endpoint() -> &'static str {
    "/gmail/v1/users/me/messages"
}

pub fn modify_endpoint(id: &str) -> String {
    format!("/gmail/v1/users/me/messages/{id}/modify")
}

pub fn metadata_query() -> Vec<(String, String)> {
    let mut query = vec![("format".to_string(), "metadata".to_string())];
    query.extend(
        METADATA_HEADERS
            .iter()
            .map(|header| ("metadataHeaders".to_string(), header.to_string())),
    );
    query
}

pub fn list_query(
    page_size: u32,
    query: Option<&str>,
    page_token: Option<&str>,
) -> Vec<(String, String)> {
    let mut params = vec![(
        "maxResults".to_string(),
        page_size.min(MAX_PAGE_SIZE).to_string(),
    )];
    if let Some(query) = query.map(str::trim).filter(|query| !query.is_empty()) {
        params.push(("q".to_string(), query.to_string()));
    }
    if let Some(token) = page_token {
        params.push(("pageToken".to_string(), token.to_string()));
    }
    params
}
