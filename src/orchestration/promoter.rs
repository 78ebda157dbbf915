//! Promotion resolver
//!
//! Locates the content view version to promote into a lifecycle environment
//! and checks whether it is already there. Promoting a version that is
//! already present is an idempotent no-op, not an error.

use tracing::info;

use crate::core::config::RunOptions;
use crate::core::error::SatelliteError;
use crate::katello::client::KatelloApi;
use crate::katello::entities::{ContentView, LifecycleEnvironment, PromoteRequest};

/// Outcome of a promote run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoteOutcome {
    /// The version is already in the target environment; nothing was sent
    AlreadyPresent { version: String },
    /// A promote was issued; `version_id` tracks the server-side task
    Promoted { version: String, version_id: u64 },
}

/// Promote a content view version into an already-resolved environment.
///
/// With an explicit version in `options`, the content view's version list is
/// scanned for an exact string match; otherwise the latest version is used.
pub async fn run_promote<A: KatelloApi>(
    api: &A,
    environment: &LifecycleEnvironment,
    options: &RunOptions,
) -> Result<PromoteOutcome, SatelliteError> {
    let content_view_id = single_content_view(environment)?;
    let content_view = api.content_view(content_view_id).await?;
    info!(
        "environment \"{}\" serves content view \"{}\"",
        environment.label, content_view.label
    );

    let version_id = resolve_version_id(&content_view, options.version.as_deref())?;
    let version = api.content_view_version(version_id).await?;

    if version.is_promoted_to(environment.id) {
        info!(
            "version {} is already promoted to \"{}\"",
            version.version, environment.label
        );
        return Ok(PromoteOutcome::AlreadyPresent {
            version: version.version,
        });
    }

    info!(
        "promoting version {} to \"{}\"...",
        version.version, environment.label
    );
    api.promote_version(
        version.id,
        &PromoteRequest {
            environment_ids: vec![environment.id],
            force: options.force,
        },
    )
    .await?;

    Ok(PromoteOutcome::Promoted {
        version: version.version,
        version_id: version.id,
    })
}

/// An environment must be served by exactly one content view
fn single_content_view(environment: &LifecycleEnvironment) -> Result<u64, SatelliteError> {
    match environment.content_views.as_slice() {
        [only] => Ok(only.id),
        other => Err(SatelliteError::ContentViewAmbiguous {
            environment: environment.label.clone(),
            count: other.len(),
        }),
    }
}

fn resolve_version_id(
    content_view: &ContentView,
    wanted: Option<&str>,
) -> Result<u64, SatelliteError> {
    match wanted {
        Some(wanted) => content_view
            .versions
            .iter()
            .find(|v| v.version == wanted)
            .map(|v| v.id)
            .ok_or_else(|| SatelliteError::VersionNotFound {
                content_view: content_view.label.clone(),
                version: wanted.to_string(),
            }),
        None => content_view
            .latest_version_id
            .ok_or_else(|| SatelliteError::VersionNotFound {
                content_view: content_view.label.clone(),
                version: "latest".to_string(),
            }),
    }
}
