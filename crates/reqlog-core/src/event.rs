//! Logged event types and payload classification
//!
//! An inbound payload is an untyped JSON value. Classification happens once,
//! when the event is captured: each recognized key is looked up, and the mere
//! presence of a key (even with an explicit `null`) places the event in the
//! corresponding shape. The resulting [`LoggedEvent`] is never modified.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Payload keys that make an event email-shaped
pub const EMAIL_KEYS: [&str; 5] = ["subject", "body", "from", "to", "emailType"];

/// Payload keys that make an event scraper-shaped
pub const SCRAPER_KEYS: [&str; 5] = ["source", "status", "articleUrl", "scrapedAt", "contentType"];

/// Scraper status used when a scraper-shaped payload carries none
pub const DEFAULT_SCRAPER_STATUS: &str = "success";

/// Content kind used when a scraper-shaped payload carries none
pub const DEFAULT_CONTENT_TYPE: &str = "article";

/// Unique identifier for a logged event
///
/// Formatted as `<unix millis>-<random suffix>`, so identifiers created later
/// sort after earlier ones at millisecond resolution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generate a fresh identifier for an event received at `at`
    pub fn generate(at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", at.timestamp_millis(), &suffix[..12]))
    }

    /// Wrap an existing identifier string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport metadata captured alongside a payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// HTTP verb used to submit the event
    pub method: String,
    /// Header snapshot (lower-case names)
    pub headers: BTreeMap<String, String>,
    /// Best-effort originating address
    pub client_address: String,
    /// URL the event was submitted to
    pub request_url: String,
}

impl RequestMeta {
    /// Create metadata for the given method with everything else empty
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    /// Set the client address
    pub fn with_client_address(mut self, address: impl Into<String>) -> Self {
        self.client_address = address.into();
        self
    }

    /// Set the request URL
    pub fn with_request_url(mut self, url: impl Into<String>) -> Self {
        self.request_url = url.into();
        self
    }

    /// Add a header to the snapshot
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Fields copied from an email-shaped payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_to: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,
}

impl EmailFields {
    fn from_payload(map: &Map<String, Value>) -> Self {
        Self {
            email_subject: text_field(map, "subject"),
            email_body: text_field(map, "body"),
            email_from: text_field(map, "from"),
            email_to: list_field(map, "to"),
            email_type: text_field(map, "emailType"),
        }
    }
}

/// Fields copied from a scraper-shaped payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ScraperFields {
    /// Copy scraper fields, substituting defaults for status, scrape time and
    /// content kind.
    fn from_payload(map: &Map<String, Value>, received_at: DateTime<Utc>) -> Self {
        Self {
            source: text_field(map, "source"),
            status: text_field(map, "status")
                .or_else(|| Some(DEFAULT_SCRAPER_STATUS.to_string())),
            article_url: text_field(map, "articleUrl"),
            scraped_at: text_field(map, "scrapedAt")
                .or_else(|| Some(received_at.to_rfc3339_opts(SecondsFormat::Millis, true))),
            content_type: text_field(map, "contentType")
                .or_else(|| Some(DEFAULT_CONTENT_TYPE.to_string())),
        }
    }
}

/// Who triggered an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
}

impl SenderIdentity {
    fn from_payload(map: &Map<String, Value>) -> Self {
        Self {
            sender_name: text_field(map, "senderName"),
            sender_id: text_field(map, "senderId"),
            session_id: text_field(map, "sessionId"),
            device_info: text_field(map, "deviceInfo"),
        }
    }
}

/// Who an event is intended for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
}

impl RecipientIdentity {
    fn from_payload(map: &Map<String, Value>) -> Self {
        Self {
            recipient_name: text_field(map, "recipientName"),
            recipient_id: text_field(map, "recipientId"),
            recipient_email: text_field(map, "recipientEmail"),
        }
    }
}

/// Shape classification of a payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Shape {
    pub is_email: bool,
    pub is_scraper: bool,
}

impl Shape {
    /// Classify a payload by key presence. Non-object payloads match nothing.
    pub fn of(payload: Option<&Value>) -> Self {
        match payload {
            Some(Value::Object(map)) => Self {
                is_email: EMAIL_KEYS.iter().any(|k| map.contains_key(*k)),
                is_scraper: SCRAPER_KEYS.iter().any(|k| map.contains_key(*k)),
            },
            _ => Self::default(),
        }
    }
}

/// One captured submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEvent {
    pub id: EventId,
    #[serde(rename = "timestamp")]
    pub received_at: DateTime<Utc>,
    pub method: String,
    #[serde(rename = "ip")]
    pub client_address: String,
    #[serde(rename = "url")]
    pub request_url: String,
    /// Original payload, `None` when absent or undecodable
    #[serde(rename = "body")]
    pub raw_body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub is_email: bool,
    pub is_scraper: bool,
    #[serde(flatten)]
    pub email: EmailFields,
    #[serde(flatten)]
    pub scraper: ScraperFields,
    #[serde(flatten)]
    pub sender: SenderIdentity,
    #[serde(flatten)]
    pub recipient: RecipientIdentity,
}

impl LoggedEvent {
    /// Build an event from a decoded payload
    ///
    /// A JSON `null` payload is treated the same as a missing one.
    pub fn capture(
        id: EventId,
        received_at: DateTime<Utc>,
        raw_body: Option<Value>,
        meta: RequestMeta,
    ) -> Self {
        let raw_body = raw_body.filter(|v| !v.is_null());
        let shape = Shape::of(raw_body.as_ref());

        let mut email = EmailFields::default();
        let mut scraper = ScraperFields::default();
        let mut sender = SenderIdentity::default();
        let mut recipient = RecipientIdentity::default();

        if let Some(Value::Object(map)) = &raw_body {
            if shape.is_email {
                email = EmailFields::from_payload(map);
            }
            if shape.is_scraper {
                scraper = ScraperFields::from_payload(map, received_at);
            }
            sender = SenderIdentity::from_payload(map);
            recipient = RecipientIdentity::from_payload(map);
        }

        Self {
            id,
            received_at,
            method: meta.method,
            client_address: meta.client_address,
            request_url: meta.request_url,
            raw_body,
            headers: meta.headers,
            is_email: shape.is_email,
            is_scraper: shape.is_scraper,
            email,
            scraper,
            sender,
            recipient,
        }
    }

    /// Shape flags frozen at capture time
    pub fn shape(&self) -> Shape {
        Shape {
            is_email: self.is_email,
            is_scraper: self.is_scraper,
        }
    }

    /// Lower-cased text searched by free-text queries
    ///
    /// Only values are included: method, URL, client address, header values,
    /// every populated field, and the raw payload dump. Wire key names such as
    /// `timestamp` or `isEmail` are not searchable.
    pub fn search_text(&self) -> String {
        let email_to = self.email.email_to.as_deref().unwrap_or_default();
        let fields = [
            &self.email.email_subject,
            &self.email.email_body,
            &self.email.email_from,
            &self.email.email_type,
            &self.scraper.source,
            &self.scraper.status,
            &self.scraper.article_url,
            &self.scraper.scraped_at,
            &self.scraper.content_type,
            &self.sender.sender_name,
            &self.sender.sender_id,
            &self.sender.session_id,
            &self.sender.device_info,
            &self.recipient.recipient_name,
            &self.recipient.recipient_id,
            &self.recipient.recipient_email,
        ];

        let raw = self.raw_body.as_ref().map(Value::to_string);

        let mut parts = vec![
            self.method.as_str(),
            self.request_url.as_str(),
            self.client_address.as_str(),
        ];
        parts.extend(self.headers.values().map(String::as_str));
        parts.extend(email_to.iter().map(String::as_str));
        parts.extend(fields.into_iter().filter_map(|f| f.as_deref()));
        parts.extend(raw.as_deref());

        parts.join("\n").to_lowercase()
    }
}

/// Textual form of a payload value; `null` yields nothing
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(value_text)
}

fn list_field(map: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    match map.get(key)? {
        Value::Null => None,
        Value::Array(items) => Some(items.iter().filter_map(value_text).collect()),
        other => value_text(other).map(|s| vec![s]),
    }
}
