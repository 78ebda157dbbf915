pub mod poller;
pub mod promoter;
pub mod publisher;
pub mod repo_fetcher;

pub use self::poller::{PollOptions, TaskPoller};
pub use self::promoter::{PromoteOutcome, run_promote};
pub use self::publisher::{PublishOutcome, run_publish};
pub use self::repo_fetcher::fetch_repositories;
