//! Publish decision engine
//!
//! Aggregates the sync state of every repository in a content view into a
//! go/no-go decision, computes the next version number and issues the
//! publish. "Nothing new to publish" is a clean outcome, not an error.
//!
//! Classification rules per repository:
//! - no sync plan: exempt, never blocks publishing
//! - no last_sync record: warned, counted in neither bucket (still blocks
//!   through the coverage check)
//! - last sync not (stopped + success): warned, not counted as synced
//! - stopped + success: synced; its end time feeds the staleness check

use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::config::RunOptions;
use crate::core::error::SatelliteError;
use crate::core::version::{CvVersion, VersionPolicy};
use crate::katello::client::KatelloApi;
use crate::katello::entities::{ContentView, PublishRequest, Repository};
use crate::orchestration::repo_fetcher::fetch_repositories;

/// Aggregated sync state of a content view's repositories
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncSummary {
    pub total: usize,
    pub synced: usize,
    pub no_sync_plan: usize,
    /// End time of the most recent successful sync, if any
    pub latest_sync: Option<DateTime<Utc>>,
}

/// Outcome of a publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The view was already published after the latest repository sync
    AlreadyCurrent,
    /// A publish was issued; `version_id` tracks the server-side task
    Published {
        version: CvVersion,
        version_id: u64,
    },
}

/// Classify each repository and track the most recent successful sync
pub fn summarize_sync(repositories: &[Repository]) -> SyncSummary {
    let mut summary = SyncSummary {
        total: repositories.len(),
        ..Default::default()
    };

    for repo in repositories {
        if !repo.has_sync_plan() {
            debug!("\"{}\" has no sync plan", repo.name);
            summary.no_sync_plan += 1;
            continue;
        }
        let Some(sync) = &repo.last_sync else {
            warn!("\"{}\" has never been synced?", repo.name);
            continue;
        };
        if sync.state != "stopped" || sync.result != "success" {
            warn!("\"{}\" sync is {}", repo.name, sync.state);
            continue;
        }
        let Some(ended) = sync.ended_at else {
            warn!("\"{}\" sync has no end time", repo.name);
            continue;
        };

        debug!("\"{}\" synced at {}", repo.name, ended);
        summary.synced += 1;
        if summary.latest_sync.is_none_or(|latest| ended > latest) {
            summary.latest_sync = Some(ended);
        }
    }

    summary
}

/// Coverage and staleness checks.
///
/// Returns `Ok(false)` when publishing should be skipped because nothing
/// has synced since the last publish. A missing `latest_sync` (empty
/// repository set, or no successful sync on record) is always considered
/// stale enough to publish.
pub fn should_publish(
    summary: &SyncSummary,
    last_published: Option<DateTime<Utc>>,
    force: bool,
) -> Result<bool, SatelliteError> {
    if summary.synced + summary.no_sync_plan < summary.total {
        if !force {
            return Err(SatelliteError::SyncCoverage {
                synced: summary.synced,
                exempt: summary.no_sync_plan,
                total: summary.total,
            });
        }
        warn!("not all repos are synced");
    }

    if let (Some(latest_sync), Some(published)) = (summary.latest_sync, last_published) {
        if latest_sync <= published {
            warn!("content view already published after latest repo sync");
            if !force {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

/// Run the full publish workflow for an already-resolved content view
pub async fn run_publish<A: KatelloApi + 'static>(
    api: Arc<A>,
    content_view: &ContentView,
    policy: VersionPolicy,
    options: &RunOptions,
) -> Result<PublishOutcome, SatelliteError> {
    info!(
        "  latest version: {}",
        content_view.latest_version.as_deref().unwrap_or("none")
    );
    match content_view.last_published {
        Some(published) => info!("  last published: {}", published),
        None => info!("  never published"),
    }

    info!(
        "fetching data for {} repositories...",
        content_view.repository_ids.len()
    );
    let repositories = fetch_repositories(
        Arc::clone(&api),
        &content_view.repository_ids,
        options.threads,
    )
    .await?;

    let summary = summarize_sync(&repositories);
    info!(
        "  {} repos synced, {} without sync plan",
        summary.synced, summary.no_sync_plan
    );
    if let Some(latest_sync) = summary.latest_sync {
        info!("  latest repo sync: {}", latest_sync);
    }

    if !should_publish(&summary, content_view.last_published, options.force)? {
        return Ok(PublishOutcome::AlreadyCurrent);
    }

    let version = match &options.version {
        Some(explicit) => explicit.parse()?,
        None => policy.next(latest_version(content_view), Local::now()),
    };

    info!("publishing content view version {}...", version);
    let response = api
        .publish_content_view(
            content_view.id,
            &PublishRequest {
                description: "auto-publish".to_string(),
                major: version.major,
                minor: version.minor,
            },
        )
        .await?;

    Ok(PublishOutcome::Published {
        version,
        version_id: response.input.content_view_version_id,
    })
}

fn latest_version(content_view: &ContentView) -> Option<CvVersion> {
    content_view
        .latest_version
        .as_deref()
        .and_then(|v| v.parse().ok())
}
