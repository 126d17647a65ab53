//! Query-string parsing for `GET /log`

use reqlog_core::LogFilter;

/// Build a filter from decoded query pairs
///
/// The first occurrence of a parameter wins, empty values are ignored, and
/// unknown parameters are skipped. `isEmail` / `isScraper` are `true` only
/// for the literal value `"true"`.
pub fn filter_from_pairs(pairs: &[(String, String)]) -> LogFilter {
    let get = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let flag = |name: &str| get(name).map(|value| value == "true");

    LogFilter {
        method: get("method"),
        email_type: get("emailType"),
        is_email: flag("isEmail"),
        is_scraper: flag("isScraper"),
        source: get("source"),
        status: get("status"),
        content_type: get("contentType"),
        sender_id: get("senderId"),
        session_id: get("sessionId"),
        recipient_id: get("recipientId"),
        recipient_email: get("recipientEmail"),
        sender_name: get("senderName"),
        recipient_name: get("recipientName"),
        search: get("search"),
    }
}
