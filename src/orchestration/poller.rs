//! Task poller
//!
//! Tracks the asynchronous server-side task behind a publish or promote by
//! polling the content view version's `last_event` until it reaches a
//! terminal state. The loop sleeps between polls and tolerates a bounded
//! number of anomalous statuses; a task that stays in progress is waited on
//! indefinitely because the server is trusted to eventually terminate it.
//!
//! Transition rules per poll:
//! - action differs from the expected one: fatal, the wrong task is running
//! - "successful": done
//! - "in progress": log progress, sleep, poll again (budget untouched)
//! - anything else (including a missing last_event): consumes one unit of
//!   the unexpected-status budget; fatal once the budget is exhausted

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::core::error::SatelliteError;
use crate::katello::client::KatelloApi;
use crate::katello::entities::{LastEvent, TaskAction};

/// Options for poll pacing and anomaly tolerance
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between polls
    pub poll_interval: Duration,
    /// How many anomalous statuses to tolerate before giving up
    pub max_unexpected: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(20),
            max_unexpected: 3,
        }
    }
}

/// What a single poll observed
#[derive(Debug, Clone, PartialEq)]
enum Poll {
    Done,
    InProgress(f64),
    Unexpected(String),
}

/// Polls one content view version's task until terminal
pub struct TaskPoller {
    expected: TaskAction,
    options: PollOptions,
}

impl TaskPoller {
    pub fn new(expected: TaskAction, options: PollOptions) -> Self {
        Self { expected, options }
    }

    /// Block until the task succeeds, or fail on a wrong action or an
    /// exhausted unexpected-status budget
    pub async fn wait<A: KatelloApi>(
        &self,
        api: &A,
        version_id: u64,
    ) -> Result<(), SatelliteError> {
        let mut unexpected = 0u32;

        loop {
            let version = api.content_view_version(version_id).await?;

            match classify(self.expected, version.last_event.as_ref())? {
                Poll::Done => {
                    info!("{} completed", self.expected);
                    return Ok(());
                }
                Poll::InProgress(progress) => {
                    info!("{} progress {:.0}%", self.expected, 100.0 * progress);
                }
                Poll::Unexpected(status) => {
                    unexpected += 1;
                    if unexpected > self.options.max_unexpected {
                        return Err(SatelliteError::TaskRetriesExhausted {
                            status,
                            attempts: unexpected,
                        });
                    }
                    warn!("unexpected status \"{}\", will retry", status);
                }
            }

            sleep(self.options.poll_interval).await;
        }
    }
}

fn classify(
    expected: TaskAction,
    last_event: Option<&LastEvent>,
) -> Result<Poll, SatelliteError> {
    let Some(event) = last_event else {
        return Ok(Poll::Unexpected("no last event".to_string()));
    };

    if event.action != expected {
        return Err(SatelliteError::UnexpectedTaskAction {
            expected: expected.to_string(),
            actual: event.action.to_string(),
        });
    }

    Ok(match event.status.as_str() {
        "successful" => Poll::Done,
        "in progress" => Poll::InProgress(event.task.as_ref().map_or(0.0, |t| t.progress)),
        other => Poll::Unexpected(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::katello::entities::{
        ContentView, ContentViewVersion, PromoteRequest, PublishRequest, PublishResponse,
        Repository, TaskProgress,
    };

    fn fast_options() -> PollOptions {
        PollOptions {
            poll_interval: Duration::from_millis(1),
            max_unexpected: 3,
        }
    }

    fn event(action: TaskAction, status: &str, progress: Option<f64>) -> Option<LastEvent> {
        Some(LastEvent {
            action,
            status: status.to_string(),
            task: progress.map(|progress| TaskProgress { progress }),
        })
    }

    fn version_with(last_event: Option<LastEvent>) -> ContentViewVersion {
        ContentViewVersion {
            id: 311,
            version: "47.4".to_string(),
            major: 47,
            minor: 4,
            environments: Vec::new(),
            last_event,
        }
    }

    /// Replays a scripted sequence of poll responses
    struct ScriptedApi {
        responses: Mutex<VecDeque<ContentViewVersion>>,
        polls: AtomicU32,
    }

    impl ScriptedApi {
        fn new(events: Vec<Option<LastEvent>>) -> Self {
            Self {
                responses: Mutex::new(events.into_iter().map(version_with).collect()),
                polls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl KatelloApi for ScriptedApi {
        async fn repository(&self, _id: u64) -> Result<Repository, SatelliteError> {
            unimplemented!()
        }

        async fn content_view(&self, _id: u64) -> Result<ContentView, SatelliteError> {
            unimplemented!()
        }

        async fn content_view_version(
            &self,
            _id: u64,
        ) -> Result<ContentViewVersion, SatelliteError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("poller asked for more responses than scripted"))
        }

        async fn publish_content_view(
            &self,
            _content_view_id: u64,
            _request: &PublishRequest,
        ) -> Result<PublishResponse, SatelliteError> {
            unimplemented!()
        }

        async fn promote_version(
            &self,
            _version_id: u64,
            _request: &PromoteRequest,
        ) -> Result<(), SatelliteError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_success_after_two_progress_polls() {
        let api = ScriptedApi::new(vec![
            event(TaskAction::Publish, "in progress", Some(0.1)),
            event(TaskAction::Publish, "in progress", Some(0.5)),
            event(TaskAction::Publish, "successful", None),
        ]);

        TaskPoller::new(TaskAction::Publish, fast_options())
            .wait(&api, 311)
            .await
            .unwrap();

        assert_eq!(api.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_fatal() {
        // 4 consecutive unknown statuses against a budget of 3
        let api = ScriptedApi::new(vec![
            event(TaskAction::Publish, "paused", None),
            event(TaskAction::Publish, "paused", None),
            event(TaskAction::Publish, "paused", None),
            event(TaskAction::Publish, "paused", None),
        ]);

        let error = TaskPoller::new(TaskAction::Publish, fast_options())
            .wait(&api, 311)
            .await
            .unwrap_err();

        match error {
            SatelliteError::TaskRetriesExhausted { status, attempts } => {
                assert_eq!(status, "paused");
                assert_eq!(attempts, 4);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(api.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_anomalies_within_budget_recover() {
        let api = ScriptedApi::new(vec![
            event(TaskAction::Publish, "paused", None),
            event(TaskAction::Publish, "in progress", Some(0.9)),
            event(TaskAction::Publish, "successful", None),
        ]);

        TaskPoller::new(TaskAction::Publish, fast_options())
            .wait(&api, 311)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_action_is_immediately_fatal() {
        let api = ScriptedApi::new(vec![event(TaskAction::Promotion, "in progress", None)]);

        let error = TaskPoller::new(TaskAction::Publish, fast_options())
            .wait(&api, 311)
            .await
            .unwrap_err();

        match error {
            SatelliteError::UnexpectedTaskAction { expected, actual } => {
                assert_eq!(expected, "publish");
                assert_eq!(actual, "promotion");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(api.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_last_event_consumes_budget() {
        let api = ScriptedApi::new(vec![
            None,
            event(TaskAction::Promotion, "successful", None),
        ]);

        TaskPoller::new(TaskAction::Promotion, fast_options())
            .wait(&api, 311)
            .await
            .unwrap();

        assert_eq!(api.polls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_classify_in_progress_without_task_defaults_to_zero() {
        let event = event(TaskAction::Publish, "in progress", None);
        let poll = classify(TaskAction::Publish, event.as_ref()).unwrap();
        assert_eq!(poll, Poll::InProgress(0.0));
    }

    #[test]
    fn test_default_poll_options() {
        let options = PollOptions::default();
        assert_eq!(options.poll_interval, Duration::from_secs(20));
        assert_eq!(options.max_unexpected, 3);
    }
}
