//! Executing facade over `RequiredWorkflowsClient`.
//!
//! Every method performs build → one transport exchange → parse and returns
//! an `ApiResponse`. A build failure short-circuits before the transport is
//! touched; the metadata is then empty.

use tracing::{debug, warn};

use crate::client::RequiredWorkflowsClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::options::{ListOptions, RequiredWorkflowOptions, SelectedRepoIds};
use crate::response::{ApiResponse, ResponseMeta};
use crate::transport::{Transport, UreqTransport};
use crate::types::{OrgRequiredWorkflow, OrgRequiredWorkflows, RepoRequiredWorkflows, SelectedRepos};

/// Required workflows operations bound to a transport.
#[derive(Debug, Clone)]
pub struct ActionsService<T = UreqTransport> {
    client: RequiredWorkflowsClient,
    transport: T,
}

impl ActionsService<UreqTransport> {
    /// Service backed by a blocking `ureq` transport configured from `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            RequiredWorkflowsClient::from_config(config),
            UreqTransport::new(config.timeout()),
        )
    }
}

impl<T: Transport> ActionsService<T> {
    pub fn new(client: RequiredWorkflowsClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &RequiredWorkflowsClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn list_org_required_workflows(
        &self,
        org: &str,
        opts: &ListOptions,
    ) -> ApiResponse<OrgRequiredWorkflows> {
        self.dispatch(
            "list_org_required_workflows",
            self.client.build_list_org_required_workflows(org, opts),
            |c, r| c.parse_list_org_required_workflows(r),
        )
    }

    pub fn create_required_workflow(
        &self,
        org: &str,
        input: &RequiredWorkflowOptions,
    ) -> ApiResponse<()> {
        self.dispatch(
            "create_required_workflow",
            self.client.build_create_required_workflow(org, input),
            |c, r| c.parse_create_required_workflow(r),
        )
    }

    pub fn get_required_workflow(
        &self,
        org: &str,
        workflow_id: u64,
    ) -> ApiResponse<OrgRequiredWorkflow> {
        self.dispatch(
            "get_required_workflow",
            self.client.build_get_required_workflow(org, workflow_id),
            |c, r| c.parse_get_required_workflow(r),
        )
    }

    pub fn update_required_workflow(
        &self,
        org: &str,
        workflow_id: u64,
        input: &RequiredWorkflowOptions,
    ) -> ApiResponse<()> {
        self.dispatch(
            "update_required_workflow",
            self.client
                .build_update_required_workflow(org, workflow_id, input),
            |c, r| c.parse_update_required_workflow(r),
        )
    }

    pub fn delete_required_workflow(&self, org: &str, workflow_id: u64) -> ApiResponse<()> {
        self.dispatch(
            "delete_required_workflow",
            self.client.build_delete_required_workflow(org, workflow_id),
            |c, r| c.parse_no_content(r),
        )
    }

    pub fn list_selected_repos(
        &self,
        org: &str,
        workflow_id: u64,
        opts: &ListOptions,
    ) -> ApiResponse<SelectedRepos> {
        self.dispatch(
            "list_selected_repos",
            self.client.build_list_selected_repos(org, workflow_id, opts),
            |c, r| c.parse_list_selected_repos(r),
        )
    }

    pub fn set_selected_repos(
        &self,
        org: &str,
        workflow_id: u64,
        ids: &SelectedRepoIds,
    ) -> ApiResponse<()> {
        self.dispatch(
            "set_selected_repos",
            self.client.build_set_selected_repos(org, workflow_id, ids),
            |c, r| c.parse_no_content(r),
        )
    }

    pub fn add_repo_to_required_workflow(
        &self,
        org: &str,
        workflow_id: u64,
        repo_id: u64,
    ) -> ApiResponse<()> {
        self.dispatch(
            "add_repo_to_required_workflow",
            self.client
                .build_add_repo_to_required_workflow(org, workflow_id, repo_id),
            |c, r| c.parse_no_content(r),
        )
    }

    pub fn remove_repo_from_required_workflow(
        &self,
        org: &str,
        workflow_id: u64,
        repo_id: u64,
    ) -> ApiResponse<()> {
        self.dispatch(
            "remove_repo_from_required_workflow",
            self.client
                .build_remove_repo_from_required_workflow(org, workflow_id, repo_id),
            |c, r| c.parse_no_content(r),
        )
    }

    pub fn list_repo_required_workflows(
        &self,
        owner: &str,
        repo: &str,
        opts: &ListOptions,
    ) -> ApiResponse<RepoRequiredWorkflows> {
        self.dispatch(
            "list_repo_required_workflows",
            self.client.build_list_repo_required_workflows(owner, repo, opts),
            |c, r| c.parse_list_repo_required_workflows(r),
        )
    }

    fn dispatch<R>(
        &self,
        operation: &'static str,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&RequiredWorkflowsClient, &HttpResponse) -> Result<R, ApiError>,
    ) -> ApiResponse<R> {
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                warn!("{operation}: rejected before sending: {err}");
                return ApiResponse {
                    response: ResponseMeta::empty(),
                    result: Err(err),
                };
            }
        };

        debug!("{operation}: {} {}", request.method, request.url);
        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!("{operation}: transport failed for {}: {err}", request.url);
                return ApiResponse {
                    response: ResponseMeta::empty(),
                    result: Err(ApiError::Transport(err)),
                };
            }
        };

        let meta = ResponseMeta::from_response(&response);
        let result = parse(&self.client, &response);
        if let Err(err) = &result {
            debug!("{operation}: {} answered {}: {err}", request.url, response.status);
        }
        ApiResponse {
            response: meta,
            result,
        }
    }
}
