//! Query and body encoders.
//!
//! # Design
//! Every optional field distinguishes "unset" (`None`, omitted from the wire)
//! from an explicit value, including zero. Bodies are compact JSON in
//! declaration order with a single trailing newline, so request bytes are
//! stable enough to assert on exactly.

use serde::Serialize;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::types::Scope;

/// Pagination options shared by all list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Encode set fields as `per_page=..&page=..`. Empty when nothing is set.
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(per_page) = self.per_page {
            query.append_pair("per_page", &per_page.to_string());
        }
        if let Some(page) = self.page {
            query.append_pair("page", &page.to_string());
        }
        query.finish()
    }
}

/// Repository IDs a `selected`-scope workflow applies to.
///
/// Order and duplicates are kept exactly as supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectedRepoIds(Vec<u64>);

impl SelectedRepoIds {
    pub fn new(ids: Vec<u64>) -> Self {
        Self(ids)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u64>> for SelectedRepoIds {
    fn from(ids: Vec<u64>) -> Self {
        Self(ids)
    }
}

impl<const N: usize> From<[u64; N]> for SelectedRepoIds {
    fn from(ids: [u64; N]) -> Self {
        Self(ids.to_vec())
    }
}

impl FromIterator<u64> for SelectedRepoIds {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Body for creating or updating a required workflow.
///
/// Field order here is the wire key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequiredWorkflowOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<SelectedRepoIds>,
}

impl RequiredWorkflowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workflow_file_path(mut self, path: impl Into<String>) -> Self {
        self.workflow_file_path = Some(path.into());
        self
    }

    pub fn repository_id(mut self, id: u64) -> Self {
        self.repository_id = Some(id);
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn selected_repository_ids(mut self, ids: impl Into<SelectedRepoIds>) -> Self {
        self.selected_repository_ids = Some(ids.into());
        self
    }

    /// Checks applied before a create request is built.
    pub fn validate_for_create(&self) -> Result<(), ApiError> {
        if self.workflow_file_path.as_deref().map_or(true, str::is_empty) {
            return Err(ApiError::InvalidOptions(
                "workflow_file_path is required".to_string(),
            ));
        }
        if self.repository_id.is_none() {
            return Err(ApiError::InvalidOptions(
                "repository_id is required".to_string(),
            ));
        }
        if self.scope == Some(Scope::Selected) && self.selected_repository_ids.is_none() {
            return Err(ApiError::InvalidOptions(
                "selected_repository_ids is required when scope is selected".to_string(),
            ));
        }
        self.check_scope_consistency()
    }

    /// Checks applied before an update request is built.
    pub fn validate_for_update(&self) -> Result<(), ApiError> {
        if *self == Self::default() {
            return Err(ApiError::InvalidOptions(
                "update must set at least one field".to_string(),
            ));
        }
        if self.workflow_file_path.as_deref() == Some("") {
            return Err(ApiError::InvalidOptions(
                "workflow_file_path must not be empty".to_string(),
            ));
        }
        self.check_scope_consistency()
    }

    fn check_scope_consistency(&self) -> Result<(), ApiError> {
        if self.scope == Some(Scope::All) && self.selected_repository_ids.is_some() {
            return Err(ApiError::InvalidOptions(
                "selected_repository_ids cannot be combined with scope all".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize)]
pub(crate) struct SelectedReposBody<'a> {
    pub selected_repository_ids: &'a SelectedRepoIds,
}

/// Serialize `value` as compact JSON terminated by `\n`.
pub fn encode_json_body<T: Serialize>(value: &T) -> Result<String, ApiError> {
    let mut body =
        serde_json::to_string(value).map_err(|e| ApiError::SerializationError(e.to_string()))?;
    body.push('\n');
    Ok(body)
}
