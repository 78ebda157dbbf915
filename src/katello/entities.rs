//! Typed wire shapes for the Katello API
//!
//! Every payload this tool consumes is decoded into one of these structs at
//! the client boundary; nothing dict-shaped leaves the `katello` module.
//! Fields are limited to what the orchestration layer actually reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Katello's list envelope for search endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub id: u64,
    pub label: String,
}

/// A bare `{id}` reference to another entity
#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: u64,
}

/// A `{id, version}` entry in a content view's version list
#[derive(Debug, Clone, Deserialize)]
pub struct VersionRef {
    pub id: u64,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentView {
    pub id: u64,
    pub label: String,
    /// "major.minor" of the newest version, absent on a never-published view
    pub latest_version: Option<String>,
    pub latest_version_id: Option<u64>,
    pub last_published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repository_ids: Vec<u64>,
    #[serde(default)]
    pub versions: Vec<VersionRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncPlanRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub sync_plan: Option<SyncPlanRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastSync {
    pub state: String,
    pub result: String,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub product: Product,
    /// Absent on a repository that has never been synced
    pub last_sync: Option<LastSync>,
}

impl Repository {
    pub fn has_sync_plan(&self) -> bool {
        self.product.sync_plan.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleEnvironment {
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub content_views: Vec<IdRef>,
}

/// Action of the asynchronous task behind a content view version's last event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Publish,
    Promotion,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Publish => "publish",
            Self::Promotion => "promotion",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskProgress {
    /// Fraction complete in [0, 1]
    pub progress: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastEvent {
    pub action: TaskAction,
    /// Raw server status string ("successful", "in progress", ...). Kept as
    /// a string so anomalous values survive into log messages.
    pub status: String,
    pub task: Option<TaskProgress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentViewVersion {
    pub id: u64,
    pub version: String,
    pub major: u32,
    pub minor: u32,
    #[serde(default)]
    pub environments: Vec<IdRef>,
    pub last_event: Option<LastEvent>,
}

impl ContentViewVersion {
    /// A version is promoted to an environment iff the environment's id
    /// appears in its `environments` list
    pub fn is_promoted_to(&self, environment_id: u64) -> bool {
        self.environments.iter().any(|e| e.id == environment_id)
    }
}

/// POST body for `/content_views/{id}/publish`
#[derive(Debug, Clone, Serialize)]
pub struct PublishRequest {
    pub description: String,
    pub major: u32,
    pub minor: u32,
}

/// POST body for `/content_view_versions/{id}/promote`
#[derive(Debug, Clone, Serialize)]
pub struct PromoteRequest {
    pub environment_ids: Vec<u64>,
    pub force: bool,
}

/// Async task reference returned by the publish endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PublishResponse {
    pub input: PublishInput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishInput {
    pub content_view_version_id: u64,
}
