//! # Reqlog Core
//!
//! The activity log store behind the reqlog HTTP collector.
//!
//! Every submission is captured as a [`LoggedEvent`]: the opaque JSON payload,
//! the transport metadata, and a set of typed fields extracted from recognized
//! payload keys. Two independent shape flags are fixed at capture time:
//!
//! - **email-shaped**: any of `subject`, `body`, `from`, `to`, `emailType`
//! - **scraper-shaped**: any of `source`, `status`, `articleUrl`, `scrapedAt`, `contentType`
//!
//! Sender and recipient identity keys are captured on any event.
//!
//! The [`LogStore`] keeps at most [`CAPACITY`] events, newest first, and
//! evicts the oldest on overflow.
//!
//! ## Example
//!
//! ```rust
//! use reqlog_core::{LogFilter, LogStore, RequestMeta};
//! use serde_json::json;
//!
//! let store = LogStore::new();
//! let event = store.append(
//!     Some(json!({ "source": "NYT", "recipientId": "r1" })),
//!     RequestMeta::new("POST"),
//! );
//! assert!(event.is_scraper);
//!
//! let results = store.query(&LogFilter::new().recipient_id("r1"));
//! assert_eq!(results.len(), 1);
//!
//! assert_eq!(store.clear(), 1);
//! ```

pub mod event;
pub mod filter;
pub mod store;

// Re-exports
pub use event::{
    EmailFields, EventId, LoggedEvent, RecipientIdentity, RequestMeta, ScraperFields,
    SenderIdentity, Shape,
};
pub use filter::{CompiledFilter, LogFilter};
pub use store::{CAPACITY, LogStats, LogStore};
