/// System label Gmail uses to flag unread mail.
pub const UNREAD: &str = "UNREAD";

pub fn list_labels_endpoint() -> &'static str {
    "/gmail/v1/users/me/labels"
}
