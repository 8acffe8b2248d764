use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

const API_URL: &str = "https://api.github.com";
const HTML_URL: &str = "https://github.com";
const DOCS_URL: &str = "https://docs.github.com/rest/actions/required-workflows";
pub const DEFAULT_RATE_LIMIT: u64 = 5000;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub html_url: String,
}

impl Repository {
    pub fn new(id: u64, owner: &str, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            full_name: format!("{owner}/{name}"),
            url: format!("{API_URL}/repos/{owner}/{name}"),
            html_url: format!("{HTML_URL}/{owner}/{name}"),
        }
    }

    pub fn owner(&self) -> &str {
        self.full_name
            .split_once('/')
            .map_or("", |(owner, _)| owner)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrgWorkflow {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub scope: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_repositories_url: Option<String>,
    pub repository: Repository,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoWorkflow {
    pub id: u64,
    pub node_id: String,
    pub name: String,
    pub path: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
    pub html_url: String,
    pub badge_url: String,
    pub source_repository: Repository,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowPage<T> {
    pub total_count: usize,
    pub required_workflows: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepositoryPage {
    pub total_count: usize,
    pub repositories: Vec<Repository>,
}

#[derive(Deserialize)]
pub struct WorkflowInput {
    pub workflow_file_path: Option<String>,
    pub repository_id: Option<u64>,
    pub scope: Option<String>,
    pub selected_repository_ids: Option<Vec<u64>>,
}

#[derive(Deserialize)]
pub struct SelectedInput {
    pub selected_repository_ids: Vec<u64>,
}

#[derive(Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Clone, Debug)]
struct StoredWorkflow {
    id: u64,
    org: String,
    name: String,
    path: String,
    scope: String,
    git_ref: String,
    state: String,
    repository_id: u64,
    selected: Vec<u64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Store {
    repositories: Vec<Repository>,
    workflows: BTreeMap<u64, StoredWorkflow>,
    next_id: u64,
}

impl Store {
    pub fn new(repositories: Vec<Repository>) -> Self {
        Self {
            repositories,
            workflows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn repository(&self, id: u64) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.id == id)
    }

    fn org_repository(&self, org: &str, id: u64) -> Option<&Repository> {
        self.repository(id).filter(|r| r.owner() == org)
    }

    fn workflow(&self, org: &str, id: u64) -> Result<&StoredWorkflow, ApiError> {
        self.workflows
            .get(&id)
            .filter(|w| w.org == org)
            .ok_or_else(ApiError::not_found)
    }

    fn workflow_mut(&mut self, org: &str, id: u64) -> Result<&mut StoredWorkflow, ApiError> {
        self.workflows
            .get_mut(&id)
            .filter(|w| w.org == org)
            .ok_or_else(ApiError::not_found)
    }

    fn org_view(&self, w: &StoredWorkflow) -> OrgWorkflow {
        let repository = self
            .repository(w.repository_id)
            .cloned()
            .unwrap_or_else(|| Repository::new(w.repository_id, &w.org, "unknown"));
        OrgWorkflow {
            id: w.id,
            name: w.name.clone(),
            path: w.path.clone(),
            scope: w.scope.clone(),
            git_ref: w.git_ref.clone(),
            state: w.state.clone(),
            selected_repositories_url: (w.scope == "selected").then(|| {
                format!(
                    "{API_URL}/orgs/{}/actions/required_workflows/{}/repositories",
                    w.org, w.id
                )
            }),
            repository,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }

    fn repo_view(&self, w: &StoredWorkflow, target: &Repository) -> RepoWorkflow {
        let source = self
            .repository(w.repository_id)
            .cloned()
            .unwrap_or_else(|| Repository::new(w.repository_id, &w.org, "unknown"));
        RepoWorkflow {
            id: w.id,
            node_id: format!("RW_{:08x}", w.id),
            name: w.name.clone(),
            path: w.path.clone(),
            state: w.state.clone(),
            created_at: w.created_at,
            updated_at: w.updated_at,
            url: format!(
                "{API_URL}/repos/{}/actions/required_workflows/{}",
                target.full_name, w.id
            ),
            html_url: format!("{HTML_URL}/{}/blob/main/{}", source.full_name, w.path),
            badge_url: format!(
                "{HTML_URL}/{}/workflows/required/{}/{}/badge.svg",
                target.full_name, source.full_name, w.path
            ),
            source_repository: source,
        }
    }

    /// Reject IDs that are not repositories of `org`.
    fn check_selection(&self, org: &str, ids: &[u64]) -> Result<(), ApiError> {
        if ids.iter().all(|id| self.org_repository(org, *id).is_some()) {
            Ok(())
        } else {
            Err(ApiError::validation("selected_repository_ids", "invalid"))
        }
    }
}

/// Fixed request budget shared by every route.
#[derive(Debug)]
struct RateBudget {
    limit: u64,
    used: AtomicU64,
    reset: i64,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    rate: Arc<RateBudget>,
}

impl AppState {
    pub fn new(repositories: Vec<Repository>, rate_limit: u64) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::new(repositories))),
            rate: Arc::new(RateBudget {
                limit: rate_limit,
                used: AtomicU64::new(0),
                reset: Utc::now().timestamp() + 3600,
            }),
        }
    }
}

/// Repositories every fresh server knows about.
pub fn seed_repositories() -> Vec<Repository> {
    vec![
        Repository::new(1296269, "o", "Hello-World"),
        Repository::new(32, "o", "alpha"),
        Repository::new(53, "o", "workflows"),
        Repository::new(91, "o", "beta"),
        Repository::new(77, "other", "elsewhere"),
    ]
}

pub fn app() -> Router {
    app_with_state(AppState::new(seed_repositories(), DEFAULT_RATE_LIMIT))
}

pub fn app_with_rate_limit(limit: u64) -> Router {
    app_with_state(AppState::new(seed_repositories(), limit))
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route(
            "/orgs/{org}/actions/required_workflows",
            get(list_org_workflows).put(create_workflow),
        )
        .route(
            "/orgs/{org}/actions/required_workflows/{id}",
            get(get_workflow)
                .patch(update_workflow)
                .delete(delete_workflow),
        )
        .route(
            "/orgs/{org}/actions/required_workflows/{id}/repositories",
            get(list_selected).put(set_selected),
        )
        .route(
            "/orgs/{org}/actions/required_workflows/{id}/repositories/{repo_id}",
            put(add_selected).delete(remove_selected),
        )
        .route(
            "/repos/{owner}/{repo}/actions/required_workflows",
            get(list_repo_workflows),
        )
        .layer(middleware::from_fn_with_state(state.clone(), stamp_headers))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- errors ---

#[derive(Debug, Serialize)]
struct FieldErrorBody {
    resource: &'static str,
    field: &'static str,
    code: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    documentation_url: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldErrorBody>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                documentation_url: DOCS_URL,
                errors: Vec::new(),
            },
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }

    fn conflict(message: &str) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    fn validation(field: &'static str, code: &'static str) -> Self {
        let mut err = Self::new(StatusCode::UNPROCESSABLE_ENTITY, "Validation Failed");
        err.body.errors.push(FieldErrorBody {
            resource: "RequiredWorkflow",
            field,
            code,
        });
        err
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// --- middleware ---

/// Attach a request id and rate-limit headers; refuse requests once the
/// budget is spent.
async fn stamp_headers(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let budget = &state.rate;
    let used = budget.used.fetch_add(1, Ordering::SeqCst) + 1;
    let mut response = if used > budget.limit {
        tracing::debug!("rate limit exhausted for {}", request.uri());
        ApiError::new(StatusCode::FORBIDDEN, "API rate limit exceeded").into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    let values = [
        ("x-ratelimit-limit", budget.limit.to_string()),
        (
            "x-ratelimit-remaining",
            budget.limit.saturating_sub(used).to_string(),
        ),
        ("x-ratelimit-used", used.min(budget.limit).to_string()),
        ("x-ratelimit-reset", budget.reset.to_string()),
        ("x-ratelimit-resource", "core".to_string()),
        ("x-github-request-id", uuid::Uuid::new_v4().to_string()),
    ];
    for (name, value) in values {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
    response
}

// --- pagination ---

const DEFAULT_PER_PAGE: usize = 30;
const MAX_PER_PAGE: usize = 100;

/// Slice `items` to the requested page and build the matching `Link` header.
fn paginate<T>(
    items: Vec<T>,
    params: &PageParams,
    headers: &HeaderMap,
    uri: &Uri,
) -> (Vec<T>, Option<HeaderValue>) {
    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    let page = params.page.unwrap_or(1).max(1);
    let last = items.len().div_ceil(per_page).max(1);

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let link_to = |n: usize, rel: &str| {
        format!(
            "<http://{host}{}?per_page={per_page}&page={n}>; rel=\"{rel}\"",
            uri.path()
        )
    };
    let mut links = Vec::new();
    if page > 1 {
        links.push(link_to(1, "first"));
        links.push(link_to((page - 1).min(last), "prev"));
    }
    if page < last {
        links.push(link_to(page + 1, "next"));
        links.push(link_to(last, "last"));
    }
    let link = (!links.is_empty())
        .then(|| HeaderValue::from_str(&links.join(", ")).ok())
        .flatten();

    let slice = items
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();
    (slice, link)
}

fn with_link<T: Serialize>(status: StatusCode, body: T, link: Option<HeaderValue>) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Some(link) = link {
        response.headers_mut().insert(header::LINK, link);
    }
    response
}

// --- handlers ---

async fn list_org_workflows(
    State(state): State<AppState>,
    Path(org): Path<String>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let store = state.store.read().await;
    let all: Vec<OrgWorkflow> = store
        .workflows
        .values()
        .filter(|w| w.org == org)
        .map(|w| store.org_view(w))
        .collect();
    let total_count = all.len();
    let (required_workflows, link) = paginate(all, &params, &headers, &uri);
    with_link(
        StatusCode::OK,
        WorkflowPage {
            total_count,
            required_workflows,
        },
        link,
    )
}

async fn create_workflow(
    State(state): State<AppState>,
    Path(org): Path<String>,
    Json(input): Json<WorkflowInput>,
) -> Result<(StatusCode, Json<OrgWorkflow>), ApiError> {
    let mut store = state.store.write().await;

    let path = input
        .workflow_file_path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("workflow_file_path", "missing_field"))?;
    let repository_id = input
        .repository_id
        .ok_or_else(|| ApiError::validation("repository_id", "missing_field"))?;
    if store.org_repository(&org, repository_id).is_none() {
        return Err(ApiError::validation("repository_id", "invalid"));
    }
    let scope = input.scope.unwrap_or_else(|| "all".to_string());
    let selected = match (scope.as_str(), input.selected_repository_ids) {
        ("all", None) => Vec::new(),
        ("selected", Some(ids)) => {
            store.check_selection(&org, &ids)?;
            ids
        }
        ("selected", None) => {
            return Err(ApiError::validation("selected_repository_ids", "missing_field"))
        }
        ("all", Some(_)) => return Err(ApiError::validation("selected_repository_ids", "invalid")),
        _ => return Err(ApiError::validation("scope", "invalid")),
    };
    if store
        .workflows
        .values()
        .any(|w| w.org == org && w.repository_id == repository_id && w.path == path)
    {
        return Err(ApiError::validation("workflow_file_path", "already_exists"));
    }

    let now = Utc::now().trunc_subsecs(0);
    let id = store.next_id;
    store.next_id += 1;
    let workflow = StoredWorkflow {
        id,
        org,
        name: workflow_name(&path),
        path,
        scope,
        git_ref: "refs/heads/main".to_string(),
        state: "active".to_string(),
        repository_id,
        selected,
        created_at: now,
        updated_at: now,
    };
    let view = store.org_view(&workflow);
    store.workflows.insert(id, workflow);
    tracing::debug!("created required workflow {id}");
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_workflow(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, u64)>,
) -> Result<Json<OrgWorkflow>, ApiError> {
    let store = state.store.read().await;
    let workflow = store.workflow(&org, id)?;
    Ok(Json(store.org_view(workflow)))
}

async fn update_workflow(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, u64)>,
    Json(input): Json<WorkflowInput>,
) -> Result<Json<OrgWorkflow>, ApiError> {
    let mut store = state.store.write().await;
    let mut updated = store.workflow(&org, id)?.clone();

    if let Some(path) = input.workflow_file_path {
        if path.is_empty() {
            return Err(ApiError::validation("workflow_file_path", "invalid"));
        }
        updated.name = workflow_name(&path);
        updated.path = path;
    }
    if let Some(repository_id) = input.repository_id {
        if store.org_repository(&org, repository_id).is_none() {
            return Err(ApiError::validation("repository_id", "invalid"));
        }
        updated.repository_id = repository_id;
    }
    if let Some(scope) = input.scope {
        match scope.as_str() {
            "all" => updated.selected.clear(),
            "selected" => {}
            _ => return Err(ApiError::validation("scope", "invalid")),
        }
        updated.scope = scope;
    }
    if let Some(ids) = input.selected_repository_ids {
        if updated.scope != "selected" {
            return Err(ApiError::validation("selected_repository_ids", "invalid"));
        }
        store.check_selection(&org, &ids)?;
        updated.selected = ids;
    }
    updated.updated_at = Utc::now().trunc_subsecs(0);

    let view = store.org_view(&updated);
    store.workflows.insert(id, updated);
    Ok(Json(view))
}

async fn delete_workflow(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, u64)>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    store.workflow(&org, id)?;
    store.workflows.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_selected(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, u64)>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, ApiError> {
    let store = state.store.read().await;
    let workflow = store.workflow(&org, id)?;
    let all: Vec<Repository> = workflow
        .selected
        .iter()
        .filter_map(|repo_id| store.repository(*repo_id).cloned())
        .collect();
    let total_count = all.len();
    let (repositories, link) = paginate(all, &params, &headers, &uri);
    Ok(with_link(
        StatusCode::OK,
        RepositoryPage {
            total_count,
            repositories,
        },
        link,
    ))
}

async fn set_selected(
    State(state): State<AppState>,
    Path((org, id)): Path<(String, u64)>,
    Json(input): Json<SelectedInput>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    if store.workflow(&org, id)?.scope != "selected" {
        return Err(ApiError::conflict("Workflow scope is not selected"));
    }
    store.check_selection(&org, &input.selected_repository_ids)?;
    store.workflow_mut(&org, id)?.selected = input.selected_repository_ids;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_selected(
    State(state): State<AppState>,
    Path((org, id, repo_id)): Path<(String, u64, u64)>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    if store.workflow(&org, id)?.scope != "selected" {
        return Err(ApiError::conflict("Workflow scope is not selected"));
    }
    if store.org_repository(&org, repo_id).is_none() {
        return Err(ApiError::not_found());
    }
    let workflow = store.workflow_mut(&org, id)?;
    if !workflow.selected.contains(&repo_id) {
        workflow.selected.push(repo_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_selected(
    State(state): State<AppState>,
    Path((org, id, repo_id)): Path<(String, u64, u64)>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    if store.workflow(&org, id)?.scope != "selected" {
        return Err(ApiError::conflict("Workflow scope is not selected"));
    }
    if store.org_repository(&org, repo_id).is_none() {
        return Err(ApiError::not_found());
    }
    store.workflow_mut(&org, id)?.selected.retain(|r| *r != repo_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_repo_workflows(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, ApiError> {
    let store = state.store.read().await;
    let target = store
        .repositories
        .iter()
        .find(|r| r.owner() == owner && r.name == repo)
        .cloned()
        .ok_or_else(ApiError::not_found)?;
    let all: Vec<RepoWorkflow> = store
        .workflows
        .values()
        .filter(|w| w.org == owner && w.state == "active")
        .filter(|w| w.scope == "all" || w.selected.contains(&target.id))
        .map(|w| store.repo_view(w, &target))
        .collect();
    let total_count = all.len();
    let (required_workflows, link) = paginate(all, &params, &headers, &uri);
    Ok(with_link(
        StatusCode::OK,
        WorkflowPage {
            total_count,
            required_workflows,
        },
        link,
    ))
}

/// Display name derived from the workflow file name.
fn workflow_name(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.')
        .map_or(file, |(stem, _)| stem)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<usize>, per_page: Option<usize>) -> PageParams {
        PageParams { page, per_page }
    }

    #[test]
    fn repository_serializes_to_json() {
        let repo = Repository::new(1296269, "o", "Hello-World");
        let json = serde_json::to_value(&repo).unwrap();
        assert_eq!(json["id"], 1296269);
        assert_eq!(json["full_name"], "o/Hello-World");
        assert_eq!(json["url"], "https://api.github.com/repos/o/Hello-World");
        assert_eq!(repo.owner(), "o");
    }

    #[test]
    fn workflow_name_drops_directory_and_extension() {
        assert_eq!(workflow_name(".github/workflows/ci.yaml"), "ci");
        assert_eq!(workflow_name("lint"), "lint");
    }

    #[test]
    fn paginate_middle_page_links_all_directions() {
        let uri: Uri = "/orgs/o/actions/required_workflows?per_page=2&page=2"
            .parse()
            .unwrap();
        let (page, link) = paginate((1..=5).collect(), &params(Some(2), Some(2)), &HeaderMap::new(), &uri);
        assert_eq!(page, vec![3, 4]);
        let link = link.unwrap();
        let link = link.to_str().unwrap();
        assert!(link.contains("per_page=2&page=1>; rel=\"first\""));
        assert!(link.contains("per_page=2&page=1>; rel=\"prev\""));
        assert!(link.contains("per_page=2&page=3>; rel=\"next\""));
        assert!(link.contains("per_page=2&page=3>; rel=\"last\""));
    }

    #[test]
    fn paginate_single_page_has_no_link() {
        let uri: Uri = "/x".parse().unwrap();
        let (page, link) = paginate(vec![1, 2], &params(None, None), &HeaderMap::new(), &uri);
        assert_eq!(page, vec![1, 2]);
        assert!(link.is_none());
    }

    #[test]
    fn paginate_past_the_end_is_empty() {
        let uri: Uri = "/x".parse().unwrap();
        let (page, _) = paginate(vec![1, 2], &params(Some(9), Some(2)), &HeaderMap::new(), &uri);
        assert!(page.is_empty());
    }

    #[test]
    fn workflow_input_all_fields_optional() {
        let input: WorkflowInput = serde_json::from_str("{}").unwrap();
        assert!(input.workflow_file_path.is_none());
        assert!(input.repository_id.is_none());
        assert!(input.scope.is_none());
        assert!(input.selected_repository_ids.is_none());
    }
}
