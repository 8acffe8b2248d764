//! Typed client for the Actions required workflows API.
//!
//! # Overview
//! `RequiredWorkflowsClient` builds `HttpRequest` values and parses
//! `HttpResponse` values without touching the network (host-does-IO
//! pattern). `ActionsService` pairs it with a `Transport` and returns an
//! `ApiResponse` per call: the decoded value or an `ApiError`, plus response
//! metadata that is present either way.
//!
//! # Design
//! - The client is stateless; it holds only the base URL and default headers.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O boundary
//!   is explicit and both halves are testable without a server.
//! - Path parameters are validated while building; a bad parameter never
//!   becomes a request.
//! - Wire models are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod options;
pub mod path;
pub mod response;
pub mod service;
pub mod transport;
pub mod types;

pub use client::RequiredWorkflowsClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, FieldError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use options::{ListOptions, RequiredWorkflowOptions, SelectedRepoIds};
pub use response::{ApiResponse, PageLinks, Rate, ResponseMeta};
pub use service::ActionsService;
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{
    Envelope, OrgRequiredWorkflow, OrgRequiredWorkflows, RepoRequiredWorkflow,
    RepoRequiredWorkflows, Repository, Scope, SelectedRepos,
};
