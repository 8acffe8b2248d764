//! Validated path templates.
//!
//! A `ResourcePath` is assembled from literal segments and caller-supplied
//! parameters. Parameters are checked as they are appended, so a bad
//! organization or repository name is rejected before any request exists.
//! Accepted parameters are percent-encoded, so `%` and spaces reach the
//! server as data rather than as escapes or a malformed URL.

use crate::error::ApiError;

/// An ordered list of path segments, rendered as `/a/b/c`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fixed segment from the endpoint template.
    pub fn literal(mut self, segment: &'static str) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    /// Append a caller-supplied segment such as an organization name.
    pub fn param(mut self, name: &'static str, value: &str) -> Result<Self, ApiError> {
        validate_segment(name, value)?;
        self.segments.push(urlencoding::encode(value).into_owned());
        Ok(self)
    }

    /// Append a numeric identifier. Always valid.
    pub fn id(mut self, value: u64) -> Self {
        self.segments.push(value.to_string());
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            out.push_str(segment);
        }
        out
    }
}

fn validate_segment(name: &'static str, value: &str) -> Result<(), ApiError> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.chars().any(char::is_control) {
        "must not contain control characters"
    } else if value.contains(['/', '?', '#']) {
        "must not contain path delimiters"
    } else {
        return Ok(());
    };
    Err(ApiError::InvalidParameter {
        name,
        value: value.to_string(),
        reason,
    })
}
