//! Response metadata returned alongside every call.
//!
//! # Design
//! `ApiResponse<T>` pairs a `Result` with `ResponseMeta`, so a caller can look
//! at status, rate-limit state and pagination even when the call failed.
//! When no response was received at all (validation short-circuit, transport
//! failure) the metadata is empty rather than absent.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Rate-limit state reported by the `X-RateLimit-*` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rate {
    pub limit: u32,
    pub remaining: u32,
    pub used: Option<u32>,
    pub reset: DateTime<Utc>,
    /// Rate-limit bucket, e.g. `core`.
    pub resource: Option<String>,
}

impl Rate {
    /// Parse rate-limit headers. `None` unless limit, remaining and reset
    /// are all present and well-formed.
    pub fn from_response(response: &HttpResponse) -> Option<Self> {
        let limit = response.header("x-ratelimit-limit")?.trim().parse().ok()?;
        let remaining = response
            .header("x-ratelimit-remaining")?
            .trim()
            .parse()
            .ok()?;
        let reset_secs: i64 = response.header("x-ratelimit-reset")?.trim().parse().ok()?;
        let reset = DateTime::from_timestamp(reset_secs, 0)?;
        Some(Self {
            limit,
            remaining,
            used: response
                .header("x-ratelimit-used")
                .and_then(|v| v.trim().parse().ok()),
            reset,
            resource: response.header("x-ratelimit-resource").map(str::to_string),
        })
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Page numbers advertised by the `Link` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub first: Option<u32>,
    pub prev: Option<u32>,
    pub next: Option<u32>,
    pub last: Option<u32>,
}

impl PageLinks {
    /// Parse a header of the form
    /// `<https://host/path?page=2>; rel="next", <https://host/path?page=5>; rel="last"`.
    ///
    /// Links without a parseable `page` query parameter are ignored.
    pub fn parse(header: &str) -> Self {
        let mut links = Self::default();
        for link in header.split(',') {
            let Some((target, params)) = link.split_once(';') else {
                continue;
            };
            let target = target.trim().trim_start_matches('<').trim_end_matches('>');
            let Some(page) = page_number(target) else {
                continue;
            };
            for param in params.split(';') {
                let rel = match param.trim().strip_prefix("rel=") {
                    Some(rel) => rel.trim_matches('"'),
                    None => continue,
                };
                // A single link may carry several space-separated relations.
                for rel in rel.split_whitespace() {
                    match rel {
                        "first" => links.first = Some(page),
                        "prev" => links.prev = Some(page),
                        "next" => links.next = Some(page),
                        "last" => links.last = Some(page),
                        _ => {}
                    }
                }
            }
        }
        links
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

fn page_number(target: &str) -> Option<u32> {
    let url = Url::parse(target).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// Metadata about the HTTP exchange behind a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// `None` when no response was received.
    pub status: Option<u16>,
    pub request_id: Option<String>,
    pub rate: Option<Rate>,
    pub pages: PageLinks,
}

impl ResponseMeta {
    /// Metadata for a call that never produced a response.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            status: Some(response.status),
            request_id: response.header("x-github-request-id").map(str::to_string),
            rate: Rate::from_response(response),
            pages: response
                .header("link")
                .map(PageLinks::parse)
                .unwrap_or_default(),
        }
    }

    pub fn received(&self) -> bool {
        self.status.is_some()
    }
}

/// Outcome of one call: the decoded value or an error, plus metadata that is
/// present either way.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub response: ResponseMeta,
    pub result: Result<T, ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        self.result
    }

    /// Split into `(value, metadata, error)`; exactly one of value and error
    /// is `Some`.
    pub fn into_parts(self) -> (Option<T>, ResponseMeta, Option<ApiError>) {
        match self.result {
            Ok(value) => (Some(value), self.response, None),
            Err(err) => (None, self.response, Some(err)),
        }
    }
}
