pub mod client;
pub mod entities;

pub use self::client::{KatelloApi, KatelloClient};
