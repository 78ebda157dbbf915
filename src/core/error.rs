//! Error handling for Satellite lifecycle automation
//!
//! This module provides one error type for the whole taxonomy: configuration
//! loading, entity resolution, sync coverage, task polling and remote HTTP
//! failures. Every variant maps to a fixed process exit code so the binary
//! has a single exit-code decision point.

use thiserror::Error;

/// Main error type for publish/promote operations
#[derive(Error, Debug)]
pub enum SatelliteError {
    // Configuration errors
    #[error("failed to load configuration from '{path}': {message}")]
    ConfigLoad { path: String, message: String },

    // Resolution errors
    #[error("cannot find organization \"{label}\"")]
    OrganizationNotFound { label: String },

    #[error("cannot find content view \"{label}\"")]
    ContentViewNotFound { label: String },

    #[error("cannot find lifecycle environment \"{label}\"")]
    EnvironmentNotFound { label: String },

    #[error("content view \"{content_view}\" has no version {version}")]
    VersionNotFound {
        content_view: String,
        version: String,
    },

    #[error("lifecycle environment \"{environment}\" has {count} content views, expected exactly 1")]
    ContentViewAmbiguous { environment: String, count: usize },

    // Publish decision errors
    #[error("not all repos are synced ({synced} synced, {exempt} without sync plan, {total} total)")]
    SyncCoverage {
        synced: usize,
        exempt: usize,
        total: usize,
    },

    #[error("invalid version \"{input}\", expected \"major.minor\"")]
    InvalidVersion { input: String },

    // Task polling errors
    #[error("last event action is \"{actual}\", expected \"{expected}\"")]
    UnexpectedTaskAction { expected: String, actual: String },

    #[error("unexpected status \"{status}\" persists after {attempts} attempts, giving up")]
    TaskRetriesExhausted { status: String, attempts: u32 },

    // Remote API errors
    #[error("server returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl SatelliteError {
    /// Process exit code for this error.
    ///
    /// 9 = configuration failure, 8 = resolution failure,
    /// 2 = operation-level failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigLoad { .. } => 9,
            Self::OrganizationNotFound { .. }
            | Self::ContentViewNotFound { .. }
            | Self::EnvironmentNotFound { .. }
            | Self::VersionNotFound { .. }
            | Self::ContentViewAmbiguous { .. } => 8,
            Self::SyncCoverage { .. }
            | Self::InvalidVersion { .. }
            | Self::UnexpectedTaskAction { .. }
            | Self::TaskRetriesExhausted { .. }
            | Self::Remote { .. }
            | Self::Http(_) => 2,
        }
    }

    /// True for errors where a requested entity could not be resolved
    pub fn is_resolution_failure(&self) -> bool {
        self.exit_code() == 8
    }
}
