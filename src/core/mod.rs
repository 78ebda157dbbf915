pub mod config;
pub mod error;
pub mod version;

pub use self::config::{RunOptions, SatelliteConfig};
pub use self::error::SatelliteError;
pub use self::version::{CvVersion, VersionPolicy};
