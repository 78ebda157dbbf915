pub mod core;
pub mod katello;
pub mod orchestration;

pub use crate::core::config::{RunOptions, SatelliteConfig};
pub use crate::core::error::SatelliteError;
pub use crate::core::version::{CvVersion, VersionPolicy};
pub use crate::katello::client::{KatelloApi, KatelloClient};
