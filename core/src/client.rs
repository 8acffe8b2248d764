//! Stateless HTTP request builder and response parser for the required
//! workflows API.
//!
//! # Design
//! `RequiredWorkflowsClient` holds only a base URL and the headers every
//! request carries. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Path parameters are validated in `build_*`, so a bad
//! argument never becomes a request.

use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{classify, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::options::{
    encode_json_body, ListOptions, RequiredWorkflowOptions, SelectedRepoIds, SelectedReposBody,
};
use crate::path::ResourcePath;
use crate::types::{OrgRequiredWorkflow, OrgRequiredWorkflows, RepoRequiredWorkflows, SelectedRepos};

const ACCEPT: &str = "application/vnd.github+json";

/// Synchronous, stateless client for the required workflows endpoints.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network. `ActionsService` pairs it with a `Transport`.
#[derive(Debug, Clone)]
pub struct RequiredWorkflowsClient {
    base_url: String,
    headers: Vec<(String, String)>,
}

impl RequiredWorkflowsClient {
    /// Client for `base_url` with default headers and no token.
    pub fn new(base_url: &str) -> Self {
        let config = ClientConfig::default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: default_headers(&config),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            headers: default_headers(config),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- organization workflows ---

    pub fn build_list_org_required_workflows(
        &self,
        org: &str,
        opts: &ListOptions,
    ) -> Result<HttpRequest, ApiError> {
        let path = org_workflows(org)?;
        Ok(self.request(HttpMethod::Get, &path, Some(opts), None))
    }

    pub fn build_create_required_workflow(
        &self,
        org: &str,
        input: &RequiredWorkflowOptions,
    ) -> Result<HttpRequest, ApiError> {
        let path = org_workflows(org)?;
        input.validate_for_create()?;
        let body = encode_json_body(input)?;
        Ok(self.request(HttpMethod::Put, &path, None, Some(body)))
    }

    pub fn build_get_required_workflow(
        &self,
        org: &str,
        workflow_id: u64,
    ) -> Result<HttpRequest, ApiError> {
        let path = org_workflows(org)?.id(workflow_id);
        Ok(self.request(HttpMethod::Get, &path, None, None))
    }

    pub fn build_update_required_workflow(
        &self,
        org: &str,
        workflow_id: u64,
        input: &RequiredWorkflowOptions,
    ) -> Result<HttpRequest, ApiError> {
        let path = org_workflows(org)?.id(workflow_id);
        input.validate_for_update()?;
        let body = encode_json_body(input)?;
        Ok(self.request(HttpMethod::Patch, &path, None, Some(body)))
    }

    pub fn build_delete_required_workflow(
        &self,
        org: &str,
        workflow_id: u64,
    ) -> Result<HttpRequest, ApiError> {
        let path = org_workflows(org)?.id(workflow_id);
        Ok(self.request(HttpMethod::Delete, &path, None, None))
    }

    // --- selected repositories ---

    pub fn build_list_selected_repos(
        &self,
        org: &str,
        workflow_id: u64,
        opts: &ListOptions,
    ) -> Result<HttpRequest, ApiError> {
        let path = selected_repos(org, workflow_id)?;
        Ok(self.request(HttpMethod::Get, &path, Some(opts), None))
    }

    pub fn build_set_selected_repos(
        &self,
        org: &str,
        workflow_id: u64,
        ids: &SelectedRepoIds,
    ) -> Result<HttpRequest, ApiError> {
        let path = selected_repos(org, workflow_id)?;
        let body = encode_json_body(&SelectedReposBody {
            selected_repository_ids: ids,
        })?;
        Ok(self.request(HttpMethod::Put, &path, None, Some(body)))
    }

    pub fn build_add_repo_to_required_workflow(
        &self,
        org: &str,
        workflow_id: u64,
        repo_id: u64,
    ) -> Result<HttpRequest, ApiError> {
        let path = selected_repos(org, workflow_id)?.id(repo_id);
        Ok(self.request(HttpMethod::Put, &path, None, None))
    }

    pub fn build_remove_repo_from_required_workflow(
        &self,
        org: &str,
        workflow_id: u64,
        repo_id: u64,
    ) -> Result<HttpRequest, ApiError> {
        let path = selected_repos(org, workflow_id)?.id(repo_id);
        Ok(self.request(HttpMethod::Delete, &path, None, None))
    }

    // --- repository view ---

    pub fn build_list_repo_required_workflows(
        &self,
        owner: &str,
        repo: &str,
        opts: &ListOptions,
    ) -> Result<HttpRequest, ApiError> {
        let path = ResourcePath::new()
            .literal("repos")
            .param("owner", owner)?
            .param("repo", repo)?
            .literal("actions")
            .literal("required_workflows");
        Ok(self.request(HttpMethod::Get, &path, Some(opts), None))
    }

    // --- parsers ---

    pub fn parse_list_org_required_workflows(
        &self,
        response: &HttpResponse,
    ) -> Result<OrgRequiredWorkflows, ApiError> {
        decode(response)
    }

    /// Create returns 201; the body is not decoded.
    pub fn parse_create_required_workflow(&self, response: &HttpResponse) -> Result<(), ApiError> {
        check_status(response)
    }

    pub fn parse_get_required_workflow(
        &self,
        response: &HttpResponse,
    ) -> Result<OrgRequiredWorkflow, ApiError> {
        decode(response)
    }

    pub fn parse_update_required_workflow(&self, response: &HttpResponse) -> Result<(), ApiError> {
        check_status(response)
    }

    pub fn parse_list_selected_repos(
        &self,
        response: &HttpResponse,
    ) -> Result<SelectedRepos, ApiError> {
        decode(response)
    }

    /// Shared by delete, set, add and remove, which all answer 204.
    pub fn parse_no_content(&self, response: &HttpResponse) -> Result<(), ApiError> {
        check_status(response)
    }

    pub fn parse_list_repo_required_workflows(
        &self,
        response: &HttpResponse,
    ) -> Result<RepoRequiredWorkflows, ApiError> {
        decode(response)
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &ResourcePath,
        opts: Option<&ListOptions>,
        body: Option<String>,
    ) -> HttpRequest {
        let mut url = format!("{}{}", self.base_url, path.render());
        if let Some(query) = opts.map(ListOptions::to_query).filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(&query);
        }
        let mut headers = self.headers.clone();
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }
}

fn default_headers(config: &ClientConfig) -> Vec<(String, String)> {
    let mut headers = vec![
        ("Accept".to_string(), ACCEPT.to_string()),
        (
            "X-GitHub-Api-Version".to_string(),
            config.api_version().to_string(),
        ),
        ("User-Agent".to_string(), config.user_agent().to_string()),
    ];
    if let Some(token) = config.token() {
        headers.push(("Authorization".to_string(), format!("Bearer {token}")));
    }
    headers
}

fn org_workflows(org: &str) -> Result<ResourcePath, ApiError> {
    Ok(ResourcePath::new()
        .literal("orgs")
        .param("org", org)?
        .literal("actions")
        .literal("required_workflows"))
}

fn selected_repos(org: &str, workflow_id: u64) -> Result<ResourcePath, ApiError> {
    Ok(org_workflows(org)?.id(workflow_id).literal("repositories"))
}

/// Any 2xx is success; everything else is classified.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(classify(response))
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}
