//! Content view version numbers and numbering policies
//!
//! Katello versions content views with a two-component "major.minor" scheme
//! (not semver). Two numbering policies exist for auto-published versions;
//! which one is active is an explicit configuration choice, never a mix.

use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::core::error::SatelliteError;

/// A content view version number ("major.minor")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CvVersion {
    pub major: u32,
    pub minor: u32,
}

impl CvVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for CvVersion {
    type Err = SatelliteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SatelliteError::InvalidVersion {
            input: s.to_string(),
        };

        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for CvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Policy for deriving the next auto-published version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionPolicy {
    /// Keep the latest version's major and increment its minor. Safe under
    /// repeated publishes on the same day.
    #[default]
    IncrementMinor,

    /// major = current year, minor = days since January 1st (Jan 1 = 0).
    /// Collides when invoked more than once per calendar day.
    DayOfYear,
}

impl VersionPolicy {
    /// Compute the next version from the content view's latest version.
    ///
    /// `latest` is `None` for a view that has never been published; the
    /// increment policy then starts at 1.0.
    pub fn next(&self, latest: Option<CvVersion>, now: DateTime<Local>) -> CvVersion {
        match self {
            Self::IncrementMinor => match latest {
                Some(version) => CvVersion::new(version.major, version.minor + 1),
                None => CvVersion::new(1, 0),
            },
            Self::DayOfYear => {
                CvVersion::new(now.year() as u32, day_of_year(now.date_naive()))
            }
        }
    }
}

/// Whole days since January 1st of the same year, so Jan 1 maps to 0
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal0()
}
