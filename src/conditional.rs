//! `If-Modified-Since` predicate and HTTP-date helpers.
//!
//! A predicate is parsed once per request and is immutable afterwards.
//! Parsing is permissive: a missing or malformed header behaves as "no
//! condition", matching how lenient HTTP clients expect servers to act.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Client-supplied freshness condition for a conditional GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalPredicate {
    /// No condition — always serve the full body.
    Absent,
    /// Serve only if the object was modified strictly after this instant.
    Since(DateTime<Utc>),
}

impl ConditionalPredicate {
    /// Parse a raw `If-Modified-Since` header value.
    ///
    /// Never fails: `None` and unparsable strings both map to `Absent`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(value) => match parse_http_date(value) {
                Some(ts) => ConditionalPredicate::Since(ts),
                None => {
                    tracing::debug!("ignoring unparsable If-Modified-Since value: {:?}", value);
                    ConditionalPredicate::Absent
                }
            },
            None => ConditionalPredicate::Absent,
        }
    }

    /// Whether an object with the given modification time should be served.
    ///
    /// Strict inequality: an object whose `Last-Modified` equals the
    /// condition is considered not modified. Comparison happens at whole
    /// seconds because HTTP dates carry one-second resolution, while the
    /// stored timestamp may carry sub-second precision.
    pub fn satisfies(&self, last_modified: DateTime<Utc>) -> bool {
        match self {
            ConditionalPredicate::Absent => true,
            ConditionalPredicate::Since(since) => {
                last_modified.timestamp() > since.timestamp()
            }
        }
    }
}

/// Format a timestamp as an RFC 1123 HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn format_http_date(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP-date leniently.
///
/// RFC 1123 dates are a subset of RFC 2822, which chrono parses directly
/// and which also tolerates numeric zone offsets. Recipients must also
/// accept the two obsolete forms RFC 7231 grandfathers in: RFC 850
/// (`Sunday, 06-Nov-94 08:49:37 GMT`) and asctime
/// (`Sun Nov  6 08:49:37 1994`), both implicitly UTC.
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc2822(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    None
}
