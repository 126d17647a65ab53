//! Filter criteria for querying the log store

use crate::event::LoggedEvent;

/// Filter criteria for querying logged events
///
/// Every populated criterion must match (logical AND). An empty filter
/// matches every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Exact HTTP method
    pub method: Option<String>,
    /// Exact email kind
    pub email_type: Option<String>,
    /// Email shape flag
    pub is_email: Option<bool>,
    /// Scraper shape flag
    pub is_scraper: Option<bool>,
    /// Exact scraper source
    pub source: Option<String>,
    /// Exact scraper status
    pub status: Option<String>,
    /// Exact content kind
    pub content_type: Option<String>,
    /// Exact sender id
    pub sender_id: Option<String>,
    /// Exact session id
    pub session_id: Option<String>,
    /// Exact recipient id
    pub recipient_id: Option<String>,
    /// Exact recipient email
    pub recipient_email: Option<String>,
    /// Case-insensitive substring of the sender name
    pub sender_name: Option<String>,
    /// Case-insensitive substring of the recipient name
    pub recipient_name: Option<String>,
    /// Case-insensitive substring of any stored value
    pub search: Option<String>,
}

impl LogFilter {
    /// Create a filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn email_type(mut self, kind: impl Into<String>) -> Self {
        self.email_type = Some(kind.into());
        self
    }

    pub fn is_email(mut self, flag: bool) -> Self {
        self.is_email = Some(flag);
        self
    }

    pub fn is_scraper(mut self, flag: bool) -> Self {
        self.is_scraper = Some(flag);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn content_type(mut self, kind: impl Into<String>) -> Self {
        self.content_type = Some(kind.into());
        self
    }

    pub fn sender_id(mut self, id: impl Into<String>) -> Self {
        self.sender_id = Some(id.into());
        self
    }

    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn recipient_id(mut self, id: impl Into<String>) -> Self {
        self.recipient_id = Some(id.into());
        self
    }

    pub fn recipient_email(mut self, email: impl Into<String>) -> Self {
        self.recipient_email = Some(email.into());
        self
    }

    /// Match sender names containing `name`, ignoring case
    pub fn sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Match recipient names containing `name`, ignoring case
    pub fn recipient_name(mut self, name: impl Into<String>) -> Self {
        self.recipient_name = Some(name.into());
        self
    }

    /// Free-text search over every stored value, ignoring case
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// True when no criterion is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Prepare the filter for repeated evaluation
    pub fn compile(&self) -> CompiledFilter<'_> {
        CompiledFilter {
            filter: self,
            sender_name: self.sender_name.as_deref().map(str::to_lowercase),
            recipient_name: self.recipient_name.as_deref().map(str::to_lowercase),
            search: self.search.as_deref().map(str::to_lowercase),
        }
    }

    /// Check a single event against this filter
    pub fn matches(&self, event: &LoggedEvent) -> bool {
        self.compile().matches(event)
    }
}

/// A [`LogFilter`] with its case-insensitive needles lowered once
#[derive(Debug)]
pub struct CompiledFilter<'a> {
    filter: &'a LogFilter,
    sender_name: Option<String>,
    recipient_name: Option<String>,
    search: Option<String>,
}

impl CompiledFilter<'_> {
    /// Check an event. Exact criteria run before the substring scans, and the
    /// free-text search runs last.
    pub fn matches(&self, event: &LoggedEvent) -> bool {
        let f = self.filter;

        if let Some(flag) = f.is_email
            && event.is_email != flag
        {
            return false;
        }
        if let Some(flag) = f.is_scraper
            && event.is_scraper != flag
        {
            return false;
        }
        if let Some(method) = &f.method
            && &event.method != method
        {
            return false;
        }

        let exact = [
            (&f.email_type, &event.email.email_type),
            (&f.source, &event.scraper.source),
            (&f.status, &event.scraper.status),
            (&f.content_type, &event.scraper.content_type),
            (&f.sender_id, &event.sender.sender_id),
            (&f.session_id, &event.sender.session_id),
            (&f.recipient_id, &event.recipient.recipient_id),
            (&f.recipient_email, &event.recipient.recipient_email),
        ];
        for (wanted, actual) in exact {
            if let Some(wanted) = wanted
                && actual.as_ref() != Some(wanted)
            {
                return false;
            }
        }

        if !contains_lowered(&self.sender_name, &event.sender.sender_name) {
            return false;
        }
        if !contains_lowered(&self.recipient_name, &event.recipient.recipient_name) {
            return false;
        }

        match &self.search {
            Some(needle) => event.search_text().contains(needle.as_str()),
            None => true,
        }
    }
}

fn contains_lowered(needle: &Option<String>, haystack: &Option<String>) -> bool {
    match (needle, haystack) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(needle), Some(haystack)) => haystack.to_lowercase().contains(needle.as_str()),
    }
}
