//! Wire models for the required workflows API.
//!
//! # Design
//! These types mirror the platform's JSON shapes and are defined
//! independently of the mock-server crate; integration tests catch any schema
//! drift between the two. Fields the platform may omit are `Option` so their
//! absence survives a decode.
//!
//! The org-scoped and repo-scoped workflow shapes are separate structs: their
//! field sets diverge and neither is a view of the other.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which repositories a required workflow applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    All,
    Selected,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Selected => f.write_str("selected"),
        }
    }
}

/// Minimal repository reference embedded in workflow payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// A required workflow as seen from the organization that owns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrgRequiredWorkflow {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub scope: Scope,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repositories_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrgRequiredWorkflow {
    pub fn is_active(&self) -> bool {
        self.state == "active"
    }
}

/// A required workflow as inherited by one repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoRequiredWorkflow {
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
    /// The repository the workflow file lives in.
    pub source_repository: Repository,
}

/// One page of a larger collection.
///
/// `items` is never the complete collection unless `total_count` says so.
/// The wire name of the item array differs per endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Envelope<T> {
    pub total_count: u64,
    #[serde(alias = "required_workflows", alias = "repositories")]
    pub items: Vec<T>,
}

impl<T> Envelope<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether this page holds less than the whole collection. Also true on
    /// the last page of several; use `PageLinks::has_next` to ask for more.
    pub fn is_partial(&self) -> bool {
        (self.items.len() as u64) < self.total_count
    }
}

impl<T> IntoIterator for Envelope<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

pub type OrgRequiredWorkflows = Envelope<OrgRequiredWorkflow>;
pub type RepoRequiredWorkflows = Envelope<RepoRequiredWorkflow>;
pub type SelectedRepos = Envelope<Repository>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn org_workflow_without_optional_fields() {
        let json = r#"{
            "id": 30433643,
            "name": "Required Linter",
            "path": ".github/workflows/lint.yml",
            "scope": "all",
            "ref": "refs/head/main",
            "state": "active",
            "created_at": "2020-01-22T19:33:08Z",
            "updated_at": "2020-01-22T19:33:08Z"
        }"#;
        let workflow: OrgRequiredWorkflow = serde_json::from_str(json).unwrap();
        assert_eq!(workflow.scope, Scope::All);
        assert_eq!(workflow.git_ref, "refs/head/main");
        assert!(workflow.selected_repositories_url.is_none());
        assert!(workflow.repository.is_none());
        assert_eq!(
            workflow.created_at,
            Utc.with_ymd_and_hms(2020, 1, 22, 19, 33, 8).unwrap()
        );
        assert!(workflow.is_active());
    }

    #[test]
    fn org_workflow_serializes_ref_under_wire_name() {
        let workflow = OrgRequiredWorkflow {
            id: 1,
            name: "Required CI".to_string(),
            path: ".github/workflows/ci.yml".to_string(),
            scope: Scope::Selected,
            git_ref: "refs/heads/main".to_string(),
            state: "active".to_string(),
            selected_repositories_url: None,
            repository: None,
            created_at: Utc.with_ymd_and_hms(2020, 1, 22, 19, 33, 8).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2020, 1, 22, 19, 33, 8).unwrap(),
        };
        let json = serde_json::to_value(&workflow).unwrap();
        assert_eq!(json["ref"], "refs/heads/main");
        assert_eq!(json["scope"], "selected");
        assert!(json.get("git_ref").is_none());
        assert!(json.get("selected_repositories_url").is_none());
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let result: Result<Scope, _> = serde_json::from_str(r#""some""#);
        assert!(result.is_err());
    }

    #[test]
    fn envelope_accepts_both_item_names() {
        let workflows: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"total_count":3,"required_workflows":[{},{}]}"#).unwrap();
        assert_eq!(workflows.len(), 2);
        assert!(workflows.is_partial());

        let repos: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"total_count":1,"repositories":[{}]}"#).unwrap();
        assert_eq!(repos.len(), 1);
        assert!(!repos.is_partial());
    }

    #[test]
    fn last_page_of_many_is_still_partial() {
        let last: Envelope<u64> =
            serde_json::from_str(r#"{"total_count":3,"repositories":[3]}"#).unwrap();
        assert!(last.is_partial());
    }

    #[test]
    fn envelope_requires_total_count() {
        let result: Result<Envelope<serde_json::Value>, _> =
            serde_json::from_str(r#"{"repositories":[]}"#);
        assert!(result.is_err());
    }
}
